//! JSON export of stored analysis results

use crate::error::{EngineError, Result};
use crate::types::AnalysisResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "2.0";

/// Top-level JSON document
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ExportMetadata,
    pub tracks: Vec<AnalysisResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// djtagger version that generated this file
    pub generator_version: String,
    /// RFC 3339 timestamp of the export
    pub exported_at: String,
    pub track_count: usize,
}

/// Write results to a JSON file
///
/// Writes to a temp file in the same directory first, then renames, so an
/// interrupted export never leaves a truncated file behind.
pub fn write_json(tracks: &[AnalysisResult], output_path: &Path) -> Result<()> {
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| EngineError::output_error(output_path, e))?;

    let document = ExportDocument {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            track_count: tracks.len(),
        },
        tracks: tracks.to_vec(),
    };

    if let Err(e) = write_document(file, &document, output_path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        EngineError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote {} tracks to {}", tracks.len(), output_path.display());
    Ok(())
}

/// Serialize `document` through a buffer and flush it, so late write errors surface
fn write_document<W: Write>(sink: W, document: &ExportDocument, output_path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(sink);
    serde_json::to_writer_pretty(&mut writer, document).map_err(|e| EngineError::OutputError {
        path: output_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    writer
        .flush()
        .map_err(|e| EngineError::output_error(output_path, e))
}

/// Read an export written by [`write_json`]
pub fn read_json(path: &Path) -> Result<ExportDocument> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HotCue, HotCueKind, ANALYSIS_VERSION};
    use tempfile::tempdir;

    fn track(path: &str) -> AnalysisResult {
        AnalysisResult {
            file_path: path.to_string(),
            file_hash: None,
            analysis_version: ANALYSIS_VERSION.to_string(),
            title: "t".into(),
            artist: "a".into(),
            album: "Unknown Album".into(),
            year: None,
            genre: "Unknown".into(),
            duration_s: 30.0,
            sample_rate: 44100,
            bit_depth: None,
            channels: None,
            codec: None,
            bpm: Some(122.0),
            bpm_confidence: 0.5,
            musical_key: Some("A".into()),
            key_confidence: 0.6,
            camelot_key: Some("11A".into()),
            energy_level: 0.2,
            dynamic_range: 0.1,
            peak_db: -6.0,
            loudness_lufs: -30.0,
            loudness_range: 2.0,
            intro_end_s: 0.0,
            outro_start_s: 30.0,
            first_beat_s: 0.2,
            last_beat_s: 29.5,
            hot_cues: vec![HotCue {
                time_s: 10.0,
                kind: HotCueKind::EnergyPeak,
                magnitude: 0.3,
            }],
            danceability: 0.1,
            valence: 0.2,
            instrumentalness: 0.3,
            speechiness: 0.4,
            overall_confidence: 0.55,
            last_analyzed: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        let tracks = vec![track("/a.wav"), track("/b.wav")];

        write_json(&tracks, &path).unwrap();
        assert!(!dir.path().join("export.json.tmp").exists());

        let doc = read_json(&path).unwrap();
        assert_eq!(doc.version, SCHEMA_VERSION);
        assert_eq!(doc.metadata.track_count, 2);
        assert_eq!(doc.tracks, tracks);
    }

    #[test]
    fn test_hot_cue_type_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.json");
        write_json(&[track("/a.wav")], &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"type\": \"energy_peak\""));
    }

    /// Accepts every write but fails to flush, like a full disk
    struct FlushFails;

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_flush_failure_is_output_error() {
        let document = ExportDocument {
            version: SCHEMA_VERSION.to_string(),
            metadata: ExportMetadata {
                generator_version: "test".into(),
                exported_at: "2024-01-01T00:00:00Z".into(),
                track_count: 1,
            },
            tracks: vec![track("/a.wav")],
        };
        let err = write_document(FlushFails, &document, Path::new("out.json")).unwrap_err();
        match err {
            EngineError::OutputError { reason, .. } => assert!(reason.contains("disk full")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory_is_output_error() {
        let err = write_json(&[], Path::new("/no/such/dir/export.json")).unwrap_err();
        assert!(matches!(err, EngineError::OutputError { .. }));
    }
}

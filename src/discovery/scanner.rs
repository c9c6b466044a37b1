//! File discovery and scanning

use crate::error::{EngineError, Result};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Audio file found on disk
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

/// Scan a path (file or directory) for supported audio files, sorted by path
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredFile>> {
    if !input.exists() {
        return Err(EngineError::FileNotFound(input.to_path_buf()));
    }

    let mut files = Vec::new();

    if input.is_file() {
        let file = discover_file(input).ok_or_else(|| EngineError::UnsupportedFormat {
            path: input.to_path_buf(),
            format: input
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
                .to_string(),
        })?;
        files.push(file);
    } else {
        let walker = WalkDir::new(input).max_depth(if recursive { usize::MAX } else { 1 });

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(file) = discover_file(entry.path()) {
                debug!("Discovered: {}", file.path.display());
                files.push(file);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
    }

    info!("Discovered {} audio files", files.len());

    if files.is_empty() {
        warn!("No supported audio files found in {}", input.display());
    }

    Ok(files)
}

fn discover_file(path: &Path) -> Option<DiscoveredFile> {
    let format = AudioFormat::from_extension(path.extension()?.to_str()?)?;
    let size_bytes = std::fs::metadata(path).ok()?.len();

    Some(DiscoveredFile {
        path: path.to_path_buf(),
        format,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"x").unwrap();
        fs::write(dir.path().join("a.flac"), b"xy").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let files = scan(dir.path(), true).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.flac", "b.mp3"]);
        assert_eq!(files[0].format, AudioFormat::Flac);
        assert_eq!(files[0].size_bytes, 2);
    }

    #[test]
    fn test_non_recursive_skips_subdirectories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.wav"), b"x").unwrap();
        fs::write(dir.path().join("sub").join("deep.wav"), b"x").unwrap();

        assert_eq!(scan(dir.path(), false).unwrap().len(), 1);
        assert_eq!(scan(dir.path(), true).unwrap().len(), 2);
    }

    #[test]
    fn test_single_unsupported_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        fs::write(&path, b"x").unwrap();
        assert!(matches!(
            scan(&path, true),
            Err(EngineError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_missing_input() {
        assert!(matches!(
            scan(Path::new("/no/such/dir"), true),
            Err(EngineError::FileNotFound(_))
        ));
    }
}

//! Core data types for djtagger
//!
//! These types represent the domain model and flow from the analyzers,
//! through the engine, into the result store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Version stamped on every stored row.
///
/// Bump whenever an analyzer changes its semantics so cached rows become stale.
pub const ANALYSIS_VERSION: &str = "2.0.0";

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 pitch classes in Western music
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs, // C#/Db
    D,
    Ds, // D#/Eb
    E,
    F,
    Fs, // F#/Gb
    G,
    Gs, // G#/Ab
    A,
    As, // A#/Bb
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Convert from numeric index (0 = C, 1 = C#, ..., 11 = B)
    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 12) as usize]
    }

    /// Convert to numeric index (0 = C, 1 = C#, ..., 11 = B)
    pub fn to_index(self) -> u8 {
        self as u8
    }

    /// Standard notation (e.g., "C", "F#")
    pub fn to_standard_notation(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parse standard notation back into a pitch class
    pub fn from_standard_notation(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.to_standard_notation() == name)
    }
}

// =============================================================================
// Per-pass analysis results
// =============================================================================

/// Tempo estimate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TempoResult {
    /// Detected BPM, `None` when there is not enough rhythmic evidence
    pub bpm: Option<f64>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
}

/// Musical key estimate (major keys only)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyResult {
    /// Detected tonic, `None` for silent input
    pub key: Option<PitchClass>,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,
    /// Camelot notation ("1A" - "12A")
    pub camelot: Option<String>,
}

/// Windowed RMS dynamics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DynamicsResult {
    pub avg_energy: f64,
    pub dynamic_range: f64,
    pub peak_db: f64,
}

impl Default for DynamicsResult {
    fn default() -> Self {
        Self {
            avg_energy: 0.0,
            dynamic_range: 0.0,
            peak_db: crate::analysis::dynamics::SILENCE_DB,
        }
    }
}

/// RMS-derived loudness approximation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessResult {
    pub lufs: f64,
    pub range: f64,
}

impl Default for LoudnessResult {
    fn default() -> Self {
        Self {
            lufs: crate::analysis::loudness::REFERENCE_LUFS,
            range: 0.0,
        }
    }
}

/// Kind of hot cue marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotCueKind {
    EnergyPeak,
}

/// Timestamped marker at a point of interest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotCue {
    pub time_s: f64,
    #[serde(rename = "type")]
    pub kind: HotCueKind,
    pub magnitude: f64,
}

/// Structural markers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureResult {
    pub intro_end_s: f64,
    pub outro_start_s: f64,
    pub first_beat_s: f64,
    pub last_beat_s: f64,
    /// At most 8 cues, strictly increasing in time
    pub hot_cues: Vec<HotCue>,
}

impl StructureResult {
    /// Markers used when the structure pass fails
    pub fn fallback(duration: f64) -> Self {
        Self {
            intro_end_s: 0.0,
            outro_start_s: duration,
            first_beat_s: 0.0,
            last_beat_s: duration,
            hot_cues: Vec::new(),
        }
    }
}

/// High-level content descriptors, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Descriptors {
    pub danceability: f64,
    pub valence: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
}

impl Default for Descriptors {
    fn default() -> Self {
        Self {
            danceability: 0.5,
            valence: 0.5,
            instrumentalness: 0.5,
            speechiness: 0.5,
        }
    }
}

// =============================================================================
// Track representation
// =============================================================================

/// Raw tags and stream properties read from the file, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub duration_seconds: Option<f64>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub channels: Option<u32>,
    pub codec: Option<String>,
}

/// Complete analysis record for a single file, one row per path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    // -- Identity --
    pub file_path: String,
    pub file_hash: Option<String>,
    pub analysis_version: String,
    // -- Metadata --
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: Option<i32>,
    pub genre: String,
    pub duration_s: f64,
    pub sample_rate: u32,
    pub bit_depth: Option<u32>,
    pub channels: Option<u32>,
    pub codec: Option<String>,
    // -- Tempo --
    pub bpm: Option<f64>,
    pub bpm_confidence: f64,
    // -- Key --
    pub musical_key: Option<String>,
    pub key_confidence: f64,
    pub camelot_key: Option<String>,
    // -- Dynamics --
    pub energy_level: f64,
    pub dynamic_range: f64,
    pub peak_db: f64,
    // -- Loudness --
    pub loudness_lufs: f64,
    pub loudness_range: f64,
    // -- Structure --
    pub intro_end_s: f64,
    pub outro_start_s: f64,
    pub first_beat_s: f64,
    pub last_beat_s: f64,
    pub hot_cues: Vec<HotCue>,
    // -- Descriptors --
    pub danceability: f64,
    pub valence: f64,
    pub instrumentalness: f64,
    pub speechiness: f64,
    // -- Analysis metadata --
    pub overall_confidence: f64,
    pub last_analyzed: DateTime<Utc>,
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Decoded audio samples ready for analysis
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Mono samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio formats the default decoder handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Aiff,
    Ogg,
    M4a,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "aiff" | "aif" => Some(AudioFormat::Aiff),
            "ogg" => Some(AudioFormat::Ogg),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}

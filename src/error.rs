//! Unified error types for djtagger
//!
//! Error strategy:
//! - Decode errors (missing file, undecodable stream): fatal to the file, no row is written
//! - Pass failures, tag and hash problems: recovered inside the engine, logged as warnings
//! - Persistence errors: always propagated to the caller
//!
//! All errors include actionable suggestions where possible.

use crate::pipeline::AnalysisStage;
use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF, OGG, M4A";

/// Top-level error type for djtagger operations
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Per-file errors - abort the file, continue the batch
    // =========================================================================
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: If the file plays in other apps, it may be corrupted or use an unsupported codec")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    // =========================================================================
    // Degraded results - the engine substitutes a default and keeps going
    // =========================================================================
    #[error("{pass} pass failed: {reason}")]
    PassFailure { pass: &'static str, reason: String },

    // =========================================================================
    // Fatal errors - propagated to the caller
    // =========================================================================
    #[error("Result store error: {0}\n  Tip: Check that the database file is writable and not locked by another process")]
    Persistence(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize stored data: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for djtagger operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Returns true if this error only concerns one file (skip it, continue the batch)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::DecodeError { .. }
                | EngineError::UnsupportedFormat { .. }
                | EngineError::FileNotFound(_)
                | EngineError::PassFailure { .. }
        )
    }

    /// The analysis stage this error belongs to
    pub fn stage(&self) -> AnalysisStage {
        match self {
            EngineError::DecodeError { .. }
            | EngineError::UnsupportedFormat { .. }
            | EngineError::FileNotFound(_) => AnalysisStage::Decoding,
            EngineError::PassFailure { .. } => AnalysisStage::Analyzing,
            EngineError::Persistence(_) | EngineError::Serialization(_) => {
                AnalysisStage::Persisting
            }
            EngineError::OutputError { .. }
            | EngineError::ConfigError(_)
            | EngineError::Io(_) => AnalysisStage::Idle,
        }
    }

    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EngineError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a pass failure for the named analyzer
    pub fn pass_failure(pass: &'static str, reason: impl Into<String>) -> Self {
        EngineError::PassFailure {
            pass,
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            _ => err.to_string(),
        };
        EngineError::OutputError { path, reason }
    }
}

//! Analyzer parameters
//!
//! Immutable for the lifetime of an engine. Loaded from defaults or from a
//! TOML file; every field is optional in the file.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Signal-processing parameters shared by all analyzer passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate the decoder resamples to (Hz)
    pub sample_rate: u32,
    /// Onset detection frame size (samples)
    pub analysis_window_size: usize,
    /// Onset detection hop (samples)
    pub hop_size: usize,
    /// Lowest tempo accepted by the tempo estimator
    pub min_bpm: f64,
    /// Highest tempo accepted by the tempo estimator
    pub max_bpm: f64,
    /// Keys below this confidence are flagged in the logs, not rejected
    pub key_confidence_threshold: f64,
    /// RMS window for the dynamics analyzer (samples)
    pub energy_window_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            analysis_window_size: 1024,
            hop_size: 512,
            min_bpm: 60.0,
            max_bpm: 200.0,
            key_confidence_threshold: 0.7,
            energy_window_size: 1024,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(text)
            .map_err(|e| EngineError::ConfigError(format!("Invalid analysis config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the analyzers cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EngineError::ConfigError("sample_rate must be > 0".into()));
        }
        if self.analysis_window_size == 0 || self.hop_size == 0 || self.energy_window_size == 0 {
            return Err(EngineError::ConfigError(
                "window and hop sizes must be > 0".into(),
            ));
        }
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) {
            return Err(EngineError::ConfigError(format!(
                "BPM range must satisfy 0 < min_bpm < max_bpm (got {}..{})",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(0.0..=1.0).contains(&self.key_confidence_threshold) {
            return Err(EngineError::ConfigError(
                "key_confidence_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

//! PCM sources
//!
//! The engine only needs "path in, mono samples out". [`PcmSource`] is that
//! seam; [`SymphoniaSource`] is the production implementation.

mod decoder;

pub use decoder::decode_mono;

use crate::error::Result;
use crate::types::AudioBuffer;
use std::path::Path;

/// Turns a file into mono f32 samples at a fixed rate
pub trait PcmSource: Send + Sync {
    /// Decode the whole file. Missing files map to `FileNotFound`,
    /// everything else that stops decoding maps to `DecodeError`.
    fn decode(&self, path: &Path) -> Result<AudioBuffer>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Decoder backed by symphonia, resampling with rubato
#[derive(Debug, Clone, Copy)]
pub struct SymphoniaSource {
    target_rate: u32,
}

impl SymphoniaSource {
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }
}

impl Default for SymphoniaSource {
    fn default() -> Self {
        Self::new(44100)
    }
}

impl PcmSource for SymphoniaSource {
    fn decode(&self, path: &Path) -> Result<AudioBuffer> {
        decode_mono(path, self.target_rate)
    }

    fn name(&self) -> &'static str {
        "symphonia"
    }
}

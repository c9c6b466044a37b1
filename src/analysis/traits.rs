//! Shared contract for analyzer pass outputs
//!
//! Every pass produces a plain value. Before the engine merges it, the value
//! is checked for non-finite numbers; a NaN or infinity anywhere turns the
//! pass into a [`EngineError::PassFailure`] and the pass default is used.

use crate::error::{EngineError, Result};
use crate::types::{
    Descriptors, DynamicsResult, KeyResult, LoudnessResult, StructureResult, TempoResult,
};

/// Output of one analyzer pass
pub trait PassOutput: Sized + Default {
    /// Pass name used in logs and errors
    const PASS: &'static str;

    /// True when every numeric field is finite
    fn is_finite(&self) -> bool;

    /// Reject outputs carrying NaN or infinities
    fn checked(self) -> Result<Self> {
        if self.is_finite() {
            Ok(self)
        } else {
            Err(EngineError::pass_failure(
                Self::PASS,
                "produced a non-finite value",
            ))
        }
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

impl PassOutput for TempoResult {
    const PASS: &'static str = "tempo";

    fn is_finite(&self) -> bool {
        self.confidence.is_finite() && self.bpm.map_or(true, f64::is_finite)
    }
}

impl PassOutput for KeyResult {
    const PASS: &'static str = "key";

    fn is_finite(&self) -> bool {
        self.confidence.is_finite()
    }
}

impl PassOutput for DynamicsResult {
    const PASS: &'static str = "dynamics";

    fn is_finite(&self) -> bool {
        all_finite(&[self.avg_energy, self.dynamic_range, self.peak_db])
    }
}

impl PassOutput for LoudnessResult {
    const PASS: &'static str = "loudness";

    fn is_finite(&self) -> bool {
        all_finite(&[self.lufs, self.range])
    }
}

impl PassOutput for StructureResult {
    const PASS: &'static str = "structure";

    fn is_finite(&self) -> bool {
        all_finite(&[
            self.intro_end_s,
            self.outro_start_s,
            self.first_beat_s,
            self.last_beat_s,
        ]) && self
            .hot_cues
            .iter()
            .all(|c| c.time_s.is_finite() && c.magnitude.is_finite())
    }
}

impl PassOutput for Descriptors {
    const PASS: &'static str = "descriptors";

    fn is_finite(&self) -> bool {
        all_finite(&[
            self.danceability,
            self.valence,
            self.instrumentalness,
            self.speechiness,
        ])
    }
}

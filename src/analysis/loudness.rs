//! Approximate loudness from RMS
//!
//! Not BS.1770: there is no K-weighting and no gating. The figure is
//! `-23 + 20·log10(rms)`, good enough to rank tracks against each other.

use super::dynamics::rms;
use crate::types::LoudnessResult;

/// Loudness assigned to a full-scale RMS of 1.0, also the failure default
pub const REFERENCE_LUFS: f64 = -23.0;

/// Loudness reported for digital silence, where the log is undefined
pub const LUFS_FLOOR: f64 = -70.0;

/// Window length for the loudness range, in seconds
pub const RANGE_WINDOW_SECS: usize = 3;

fn rms_to_lufs(value: f64) -> f64 {
    if value <= 0.0 {
        return LUFS_FLOOR;
    }
    REFERENCE_LUFS + 20.0 * value.log10()
}

/// Whole-signal loudness plus the P95 - P10 spread of 3 second windows
pub fn analyze_loudness(samples: &[f32], sample_rate: u32) -> LoudnessResult {
    let lufs = rms_to_lufs(rms(samples));

    let window = sample_rate as usize * RANGE_WINDOW_SECS;
    let mut values: Vec<f64> = if window == 0 {
        Vec::new()
    } else {
        samples
            .chunks_exact(window)
            .map(|w| rms_to_lufs(rms(w)))
            .collect()
    };

    let range = if values.is_empty() {
        0.0
    } else {
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let p95 = values[(n as f64 * 0.95).floor() as usize];
        let p10 = values[(n as f64 * 0.10).floor() as usize];
        p95 - p10
    };

    LoudnessResult { lufs, range }
}

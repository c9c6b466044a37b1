//! Energy-based onset detection
//!
//! Frames of `window` samples advance by `hop`; only full frames count. A
//! frame is an onset when its energy rises more than 30% over the previous
//! frame.

use tracing::trace;

/// Energy ratio a frame must exceed over its predecessor
pub const ONSET_RATIO: f64 = 1.3;

/// Detect onsets, returning ascending times in seconds (frame start / rate)
pub fn detect_onsets(samples: &[f32], sample_rate: u32, window: usize, hop: usize) -> Vec<f64> {
    if sample_rate == 0 || window == 0 || hop == 0 {
        return Vec::new();
    }

    let energies = frame_energies(samples, window, hop);
    if energies.len() < 2 {
        return Vec::new();
    }

    let onsets: Vec<f64> = energies
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1] > pair[0] * ONSET_RATIO)
        .map(|(i, _)| ((i + 1) * hop) as f64 / sample_rate as f64)
        .collect();

    trace!("{} frames, {} onsets", energies.len(), onsets.len());
    onsets
}

/// Sum of squares for every full frame
fn frame_energies(samples: &[f32], window: usize, hop: usize) -> Vec<f64> {
    if samples.len() < window {
        return Vec::new();
    }
    let frames = (samples.len() - window) / hop + 1;
    (0..frames)
        .map(|i| {
            samples[i * hop..i * hop + window]
                .iter()
                .map(|&s| (s as f64) * (s as f64))
                .sum()
        })
        .collect()
}

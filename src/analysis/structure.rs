//! Intro/outro boundaries, beat markers and hot cues
//!
//! The signal is cut into 10 second blocks (the last one may be shorter) and
//! each block's RMS is compared against half the mean block RMS.

use super::dynamics::rms;
use crate::types::{HotCue, HotCueKind, StructureResult};

/// Block length in seconds
pub const BLOCK_SECS: f64 = 10.0;

/// Most hot cues kept per track
pub const MAX_HOT_CUES: usize = 8;

/// Fraction of the mean block RMS a block must exceed to count as "in"
const THRESHOLD_RATIO: f64 = 0.5;

/// RMS of consecutive 10 second blocks, trailing partial block included
pub fn block_energies(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    let block = (sample_rate as f64 * BLOCK_SECS) as usize;
    if block == 0 {
        return Vec::new();
    }
    samples.chunks(block).map(rms).collect()
}

/// Derive structural markers
///
/// `onsets` are the ascending onset times from the onset detector;
/// `duration` is the decoded duration in seconds.
pub fn analyze_structure(
    samples: &[f32],
    sample_rate: u32,
    onsets: &[f64],
    duration: f64,
) -> StructureResult {
    let energies = block_energies(samples, sample_rate);
    if energies.is_empty() {
        return StructureResult::fallback(duration);
    }

    let mean = energies.iter().sum::<f64>() / energies.len() as f64;
    let threshold = mean * THRESHOLD_RATIO;

    let intro_end_s = energies
        .iter()
        .position(|&e| e > threshold)
        .map_or(0.0, |i| i as f64 * BLOCK_SECS);

    let outro_start_s = energies
        .iter()
        .rposition(|&e| e > threshold)
        .map_or(duration, |i| ((i + 1) as f64 * BLOCK_SECS).min(duration));

    StructureResult {
        intro_end_s,
        outro_start_s,
        first_beat_s: onsets.first().copied().unwrap_or(0.0),
        last_beat_s: onsets.last().copied().unwrap_or(duration),
        hot_cues: hot_cues(&energies),
    }
}

/// Local energy peaks, the strongest [`MAX_HOT_CUES`] in time order
pub fn hot_cues(energies: &[f64]) -> Vec<HotCue> {
    if energies.len() < 3 {
        return Vec::new();
    }

    let mut cues: Vec<HotCue> = energies
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
        .map(|(i, w)| HotCue {
            time_s: (i + 1) as f64 * BLOCK_SECS,
            kind: HotCueKind::EnergyPeak,
            magnitude: w[1],
        })
        .collect();

    // Stable sort: equal magnitudes keep the earlier cue
    cues.sort_by(|a, b| b.magnitude.total_cmp(&a.magnitude));
    cues.truncate(MAX_HOT_CUES);
    cues.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 100;

    /// One constant-level block per entry, 10s each at 100 Hz
    fn blocks(levels: &[f32]) -> Vec<f32> {
        levels
            .iter()
            .flat_map(|&l| std::iter::repeat(l).take(1000))
            .collect()
    }

    #[test]
    fn test_silent_tail_sets_outro() {
        let mut levels = vec![0.5f32; 11];
        levels.push(0.0);
        let samples = blocks(&levels);
        let result = analyze_structure(&samples, RATE, &[], 120.0);
        assert_eq!(result.outro_start_s, 110.0);
        assert_eq!(result.intro_end_s, 0.0);
    }

    #[test]
    fn test_quiet_intro() {
        let samples = blocks(&[0.01, 0.01, 0.6, 0.6, 0.6, 0.6]);
        let result = analyze_structure(&samples, RATE, &[], 60.0);
        assert_eq!(result.intro_end_s, 20.0);
        assert_eq!(result.outro_start_s, 60.0);
    }

    #[test]
    fn test_outro_capped_at_duration() {
        // 25s: the last block is a 5s partial block
        let mut samples = blocks(&[0.5, 0.5]);
        samples.extend(vec![0.5f32; 500]);
        let result = analyze_structure(&samples, RATE, &[], 25.0);
        assert_eq!(result.outro_start_s, 25.0);
    }

    #[test]
    fn test_beats_from_onsets() {
        let samples = blocks(&[0.5, 0.5]);
        let result = analyze_structure(&samples, RATE, &[1.5, 3.0, 17.25], 20.0);
        assert_eq!(result.first_beat_s, 1.5);
        assert_eq!(result.last_beat_s, 17.25);

        let result = analyze_structure(&samples, RATE, &[], 20.0);
        assert_eq!(result.first_beat_s, 0.0);
        assert_eq!(result.last_beat_s, 20.0);
    }

    #[test]
    fn test_empty_input_falls_back() {
        let result = analyze_structure(&[], RATE, &[], 0.0);
        assert_eq!(result, StructureResult::fallback(0.0));
    }

    #[test]
    fn test_hot_cues_are_interior_peaks() {
        let cues = hot_cues(&[0.9, 0.1, 0.5, 0.2, 0.2, 0.7, 0.3, 0.8]);
        let times: Vec<f64> = cues.iter().map(|c| c.time_s).collect();
        // Index 0 and the last index are never cues; the 0.2 plateau is not a peak
        assert_eq!(times, vec![20.0, 50.0]);
        assert_eq!(cues[1].magnitude, 0.7);
        assert!(cues.iter().all(|c| c.kind == HotCueKind::EnergyPeak));
    }

    #[test]
    fn test_hot_cues_keep_strongest_eight_in_time_order() {
        // Alternating low/high gives a peak at every odd block: 12 candidates
        let energies: Vec<f64> = (0..25)
            .map(|i| if i % 2 == 1 { 0.1 + i as f64 * 0.01 } else { 0.0 })
            .collect();
        let cues = hot_cues(&energies);
        assert_eq!(cues.len(), MAX_HOT_CUES);
        assert!(cues.windows(2).all(|w| w[0].time_s < w[1].time_s));
        // The four weakest (earliest) peaks were dropped
        assert_eq!(cues[0].time_s, 90.0);
    }
}

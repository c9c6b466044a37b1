//! Tempo estimation from onset spacing
//!
//! Each inter-onset interval votes for `round(60 / interval)` BPM. Votes
//! outside the configured range are dropped but still count toward the
//! total, so confidence is the share of *all* intervals that agree with
//! the winning tempo.

use crate::types::TempoResult;
use std::collections::BTreeMap;
use tracing::trace;

/// Minimum onsets needed before a tempo is reported
pub const MIN_ONSETS: usize = 4;

/// Estimate tempo from ascending onset times (seconds)
pub fn estimate_tempo(onsets: &[f64], min_bpm: f64, max_bpm: f64) -> TempoResult {
    if onsets.len() < MIN_ONSETS {
        return TempoResult::default();
    }

    let intervals: Vec<f64> = onsets.windows(2).map(|w| w[1] - w[0]).collect();

    // BTreeMap iterates ascending, so with a strict comparison the lowest BPM wins ties
    let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
    for interval in &intervals {
        if *interval <= 0.0 {
            continue;
        }
        let bpm = (60.0 / interval).round();
        if bpm >= min_bpm && bpm <= max_bpm {
            *histogram.entry(bpm as i64).or_insert(0) += 1;
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for (&bpm, &count) in &histogram {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((bpm, count));
        }
    }

    match best {
        Some((bpm, count)) => {
            trace!(
                "Tempo histogram: {} bins, winner {} BPM ({}/{} intervals)",
                histogram.len(),
                bpm,
                count,
                intervals.len()
            );
            TempoResult {
                bpm: Some(bpm as f64),
                confidence: count as f64 / intervals.len() as f64,
            }
        }
        None => TempoResult::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_120_bpm() {
        let result = estimate_tempo(&[0.0, 0.5, 1.0, 1.5], 60.0, 200.0);
        assert_eq!(result.bpm, Some(120.0));
        assert!((result.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_onsets() {
        let result = estimate_tempo(&[0.0, 0.5, 1.0], 60.0, 200.0);
        assert_eq!(result, TempoResult::default());
    }

    #[test]
    fn test_tie_resolves_to_lowest_bpm() {
        // Two intervals at 150 BPM (0.4s), two at 100 BPM (0.6s)
        let onsets = [0.0, 0.4, 0.8, 1.4, 2.0];
        let result = estimate_tempo(&onsets, 60.0, 200.0);
        assert_eq!(result.bpm, Some(100.0));
        assert!((result.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_intervals_stay_in_denominator() {
        // 0.1s intervals vote 600 BPM and are discarded
        let onsets = [0.0, 0.5, 1.0, 1.1, 1.2];
        let result = estimate_tempo(&onsets, 60.0, 200.0);
        assert_eq!(result.bpm, Some(120.0));
        assert!((result.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nothing_in_range() {
        let onsets = [0.0, 0.1, 0.2, 0.3, 0.4];
        let result = estimate_tempo(&onsets, 60.0, 200.0);
        assert_eq!(result.bpm, None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_bpm_within_configured_range() {
        let onsets: Vec<f64> = (0..16).map(|i| i as f64 * 0.35).collect();
        let result = estimate_tempo(&onsets, 60.0, 200.0);
        let bpm = result.bpm.unwrap();
        assert!((60.0..=200.0).contains(&bpm));
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}

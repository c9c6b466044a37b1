//! Windowed RMS energy and dynamics

use crate::types::DynamicsResult;

/// Floor for dB values derived from a zero RMS
pub const SILENCE_DB: f64 = -96.0;

/// Root mean square of a slice, 0 for an empty slice
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// `20·log10(value)` floored at [`SILENCE_DB`]
pub fn to_db(value: f64) -> f64 {
    if value <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * value.log10()).max(SILENCE_DB)
}

/// RMS statistics over non-overlapping full windows of `window` samples
pub fn analyze_dynamics(samples: &[f32], window: usize) -> DynamicsResult {
    if window == 0 {
        return DynamicsResult::default();
    }

    let energies: Vec<f64> = samples.chunks_exact(window).map(rms).collect();
    if energies.is_empty() {
        return DynamicsResult::default();
    }

    let max = energies.iter().copied().fold(f64::MIN, f64::max);
    let min = energies.iter().copied().fold(f64::MAX, f64::min);
    let avg = energies.iter().sum::<f64>() / energies.len() as f64;

    DynamicsResult {
        avg_energy: avg,
        dynamic_range: max - min,
        peak_db: to_db(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_defaults() {
        let result = analyze_dynamics(&[], 1024);
        assert_eq!(result.avg_energy, 0.0);
        assert_eq!(result.dynamic_range, 0.0);
        assert_eq!(result.peak_db, -96.0);
    }

    #[test]
    fn test_constant_signal() {
        let result = analyze_dynamics(&vec![0.5; 4096], 1024);
        assert!((result.avg_energy - 0.5).abs() < 1e-9);
        assert!(result.dynamic_range.abs() < 1e-9);
        assert!((result.peak_db - 20.0 * 0.5f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn test_range_between_loud_and_quiet_windows() {
        let mut samples = vec![0.1f32; 1024];
        samples.extend(vec![0.9f32; 1024]);
        // Trailing partial window is ignored
        samples.extend(vec![1.0f32; 100]);
        let result = analyze_dynamics(&samples, 1024);
        assert!((result.dynamic_range - 0.8).abs() < 1e-6);
        assert!((result.avg_energy - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_silence_floors_peak() {
        let result = analyze_dynamics(&vec![0.0; 2048], 1024);
        assert_eq!(result.peak_db, SILENCE_DB);
    }
}

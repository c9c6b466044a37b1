//! High-level content descriptors
//!
//! The "spectral" features here are computed over the time-domain buffer:
//! sample index stands in for frequency bin. They are rough heuristics and
//! are kept as-is so stored values stay reproducible across versions.

use crate::types::Descriptors;

/// Share of total energy that defines the rolloff point
const ROLLOFF_FRACTION: f64 = 0.85;

/// Magnitude-weighted mean "frequency" of the buffer, 0 for silence
pub fn spectral_centroid(samples: &[f32], sample_rate: u32) -> f64 {
    let n = samples.len() as f64;
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (i, &s) in samples.iter().enumerate() {
        let magnitude = s.abs() as f64;
        weighted += i as f64 * sample_rate as f64 / n * magnitude;
        total += magnitude;
    }
    if total > 0.0 {
        weighted / total
    } else {
        0.0
    }
}

/// "Frequency" below which 85% of the energy lies
///
/// 0 for silence, Nyquist if the cumulative energy never gets there.
pub fn spectral_rolloff(samples: &[f32], sample_rate: u32) -> f64 {
    let energy: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    if energy <= 0.0 {
        return 0.0;
    }

    let target = ROLLOFF_FRACTION * energy;
    let n = samples.len() as f64;
    let mut cumulative = 0.0;
    for (i, &s) in samples.iter().enumerate() {
        cumulative += (s as f64) * (s as f64);
        if cumulative >= target {
            return i as f64 * sample_rate as f64 / n;
        }
    }
    sample_rate as f64 / 2.0
}

/// Sign changes per sample; zero counts as positive
pub fn zero_crossing_rate(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f64 / samples.len() as f64
}

/// Map the low-level features onto the four [0, 1] descriptors
pub fn synthesize(samples: &[f32], sample_rate: u32) -> Descriptors {
    let centroid = spectral_centroid(samples, sample_rate);
    let rolloff = spectral_rolloff(samples, sample_rate);
    let zcr = zero_crossing_rate(samples);

    Descriptors {
        danceability: (centroid / 3000.0).clamp(0.0, 1.0),
        valence: ((rolloff - 2000.0) / 8000.0).clamp(0.0, 1.0),
        instrumentalness: (1.0 - zcr * 100.0).clamp(0.0, 1.0),
        speechiness: (zcr * 50.0).clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence() {
        let samples = vec![0.0f32; 1000];
        assert_eq!(spectral_centroid(&samples, 44100), 0.0);
        assert_eq!(spectral_rolloff(&samples, 44100), 0.0);
        assert_eq!(zero_crossing_rate(&samples), 0.0);

        let d = synthesize(&samples, 44100);
        assert_eq!(d.danceability, 0.0);
        assert_eq!(d.valence, 0.0);
        assert_eq!(d.instrumentalness, 1.0);
        assert_eq!(d.speechiness, 0.0);
    }

    #[test]
    fn test_alternating_signal_is_speechy() {
        let samples: Vec<f32> = (0..1000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let zcr = zero_crossing_rate(&samples);
        assert!((zcr - 0.999).abs() < 1e-9);

        let d = synthesize(&samples, 44100);
        assert_eq!(d.speechiness, 1.0);
        assert_eq!(d.instrumentalness, 0.0);
    }

    #[test]
    fn test_constant_signal_centroid_is_midpoint() {
        // Uniform magnitude: centroid is the mean index mapped to Hz
        let samples = vec![0.5f32; 100];
        let centroid = spectral_centroid(&samples, 100);
        assert!((centroid - 49.5).abs() < 1e-9);
        let rolloff = spectral_rolloff(&samples, 100);
        assert!((rolloff - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_descriptors_in_unit_range() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 0.05).sin() * ((i % 300) as f32 / 300.0))
            .collect();
        let d = synthesize(&samples, 44100);
        for v in [d.danceability, d.valence, d.instrumentalness, d.speechiness] {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}

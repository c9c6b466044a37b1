//! Major-key detection by chroma/template correlation
//!
//! The chroma vector is a coarse approximation: every full 2048-sample window
//! adds `|sample|` into bin `(index within window) mod 12`. It is then scored
//! against the twelve rotations of the C major scale.

pub mod camelot;

use crate::types::{KeyResult, PitchClass};
use tracing::trace;

/// Window length for chroma accumulation
pub const CHROMA_WINDOW: usize = 2048;

/// Scale degrees of C major, one flag per pitch class
const MAJOR_TEMPLATE: [f64; 12] = [1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

/// Accumulate the 12-bin chroma vector over full windows
pub fn chromagram(samples: &[f32]) -> [f64; 12] {
    let mut chroma = [0.0f64; 12];
    for window in samples.chunks_exact(CHROMA_WINDOW) {
        for (j, s) in window.iter().enumerate() {
            chroma[j % 12] += s.abs() as f64;
        }
    }
    chroma
}

/// Correlation of `chroma` with the major template rooted on `tonic`
fn template_score(chroma: &[f64; 12], tonic: usize) -> f64 {
    chroma
        .iter()
        .enumerate()
        .map(|(i, c)| c * MAJOR_TEMPLATE[(i + 12 - tonic) % 12])
        .sum()
}

/// Detect the major key of a mono buffer
///
/// Silent input (no chroma energy) yields no key and zero confidence.
pub fn detect_key(samples: &[f32]) -> KeyResult {
    let chroma = chromagram(samples);
    let total: f64 = chroma.iter().sum();
    if total <= 0.0 {
        return KeyResult::default();
    }

    // Strict comparison keeps the first key in C..B order on ties
    let mut best = (0usize, template_score(&chroma, 0));
    for tonic in 1..12 {
        let score = template_score(&chroma, tonic);
        if score > best.1 {
            best = (tonic, score);
        }
    }

    let tonic = PitchClass::from_index(best.0 as u8);
    trace!("Chroma {:?}, best {:?} ({:.3})", chroma, tonic, best.1);

    KeyResult {
        key: Some(tonic),
        confidence: (best.1 / total).clamp(0.0, 1.0),
        camelot: Some(camelot::to_camelot(tonic).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A signal whose magnitude pattern restarts with every chroma window
    fn periodic(pattern: [f32; 12], windows: usize) -> Vec<f32> {
        (0..CHROMA_WINDOW * windows)
            .map(|i| pattern[(i % CHROMA_WINDOW) % 12])
            .collect()
    }

    #[test]
    fn test_silence_has_no_key() {
        let result = detect_key(&vec![0.0; CHROMA_WINDOW * 4]);
        assert_eq!(result.key, None);
        assert_eq!(result.camelot, None);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_short_input_has_no_key() {
        let result = detect_key(&vec![0.5; CHROMA_WINDOW - 1]);
        assert_eq!(result.key, None);
    }

    #[test]
    fn test_c_major_pattern() {
        let pattern = [1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let result = detect_key(&periodic(pattern, 2));
        assert_eq!(result.key, Some(PitchClass::C));
        assert_eq!(result.camelot.as_deref(), Some("8A"));
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_g_major_pattern() {
        // G major: G A B C D E F#
        let mut pattern = [0.0f32; 12];
        for pc in [7, 9, 11, 0, 2, 4, 6] {
            pattern[pc] = 0.8;
        }
        let result = detect_key(&periodic(pattern, 3));
        assert_eq!(result.key, Some(PitchClass::G));
        assert_eq!(result.camelot.as_deref(), Some("9A"));
    }

    #[test]
    fn test_flat_chroma_ties_to_c() {
        let result = detect_key(&vec![0.25; CHROMA_WINDOW * 2]);
        assert_eq!(result.key, Some(PitchClass::C));
        // 2048 is not a multiple of 12, so the low bins are slightly heavier
        assert!((result.confidence - 7.0 / 12.0).abs() < 1e-2);
    }
}

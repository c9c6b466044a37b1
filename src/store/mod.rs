//! Persistent analysis results, one row per file path

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteResultStore;

use crate::analysis::key::camelot;
use crate::error::Result;
use crate::types::AnalysisResult;

/// Storage backend for analysis results
pub trait ResultStore: Send + Sync {
    /// Insert or fully replace the row for `result.file_path`.
    ///
    /// On replace the row id and creation time are kept, and the stored
    /// `last_analyzed` never moves backwards.
    fn save(&self, result: &AnalysisResult) -> Result<()>;

    /// Row for `file_path`, if any
    fn get(&self, file_path: &str) -> Result<Option<AnalysisResult>>;

    /// Rows with `min <= bpm <= max`, ordered by BPM
    fn find_by_bpm_range(&self, min: f64, max: f64) -> Result<Vec<AnalysisResult>>;

    /// Rows whose Camelot code is one of `keys`
    fn find_by_camelot_keys(&self, keys: &[String]) -> Result<Vec<AnalysisResult>>;

    /// Every row, ordered by path
    fn all(&self) -> Result<Vec<AnalysisResult>>;

    /// Number of stored rows
    fn count(&self) -> Result<usize>;

    /// Tracks that mix with `file_path`: a compatible Camelot key and a BPM
    /// within `bpm_tolerance`, closest tempo first.
    ///
    /// Empty when the track is unknown or has no BPM or key.
    fn find_harmonic_matches(
        &self,
        file_path: &str,
        bpm_tolerance: f64,
    ) -> Result<Vec<AnalysisResult>> {
        let Some(seed) = self.get(file_path)? else {
            return Ok(Vec::new());
        };
        let (Some(bpm), Some(code)) = (seed.bpm, seed.camelot_key.as_deref()) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<AnalysisResult> = self
            .find_by_camelot_keys(&camelot::compatible_keys(code))?
            .into_iter()
            .filter(|r| r.file_path != seed.file_path)
            .filter(|r| r.bpm.is_some_and(|b| (b - bpm).abs() <= bpm_tolerance))
            .collect();

        matches.sort_by(|a, b| {
            let da = (a.bpm.unwrap_or(bpm) - bpm).abs();
            let db = (b.bpm.unwrap_or(bpm) - bpm).abs();
            da.total_cmp(&db).then_with(|| a.file_path.cmp(&b.file_path))
        });
        Ok(matches)
    }
}

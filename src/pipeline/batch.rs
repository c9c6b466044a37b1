//! Batch analysis over many files
//!
//! Files fan out over the engine's batch pool. A failing file becomes a
//! [`BatchOutcome::Failure`] and never stops the rest of the batch.

use super::engine::{path_key, AnalyzerEngine};
use crate::types::AnalysisResult;
use rayon::prelude::*;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Progress after each finished file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Files finished so far, strictly increasing across callbacks
    pub completed: usize,
    pub total: usize,
    /// The file that just finished
    pub current: String,
}

/// Result for one input path
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Success {
        file_path: String,
        result: Box<AnalysisResult>,
    },
    Failure {
        file_path: String,
        error: String,
    },
}

impl BatchOutcome {
    pub fn file_path(&self) -> &str {
        match self {
            BatchOutcome::Success { file_path, .. } | BatchOutcome::Failure { file_path, .. } => {
                file_path
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success { .. })
    }
}

/// Progress callback, invoked from worker threads
pub type ProgressFn<'a> = &'a (dyn Fn(BatchProgress) + Sync);

impl AnalyzerEngine {
    /// Analyze every path, returning one outcome per path in input order
    pub fn batch_analyze<P>(&self, paths: &[P], on_progress: Option<ProgressFn<'_>>) -> Vec<BatchOutcome>
    where
        P: AsRef<Path> + Sync,
    {
        self.run_batch(paths, on_progress, |path| self.analyze(path))
    }

    /// Like [`batch_analyze`](Self::batch_analyze), but fresh rows are returned
    /// from the store instead of being recomputed
    pub fn batch_analyze_stale<P>(
        &self,
        paths: &[P],
        on_progress: Option<ProgressFn<'_>>,
    ) -> Vec<BatchOutcome>
    where
        P: AsRef<Path> + Sync,
    {
        self.run_batch(paths, on_progress, |path| self.analyze_if_stale(path))
    }

    fn run_batch<P, F>(
        &self,
        paths: &[P],
        on_progress: Option<ProgressFn<'_>>,
        analyze: F,
    ) -> Vec<BatchOutcome>
    where
        P: AsRef<Path> + Sync,
        F: Fn(&Path) -> crate::Result<AnalysisResult> + Sync,
    {
        let total = paths.len();
        let completed = Mutex::new(0usize);
        info!("Batch of {} files", total);

        let outcomes: Vec<BatchOutcome> = self.batch_pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let path = path.as_ref();
                    let file_path = path_key(path);

                    let outcome = match analyze(path) {
                        Ok(result) => BatchOutcome::Success {
                            file_path: file_path.clone(),
                            result: Box::new(result),
                        },
                        Err(e) => {
                            warn!("Failed {}: {}", file_path, e);
                            BatchOutcome::Failure {
                                file_path: file_path.clone(),
                                error: e.to_string(),
                            }
                        }
                    };

                    // The counter lock also orders the callbacks
                    let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
                    *done += 1;
                    if let Some(callback) = on_progress {
                        callback(BatchProgress {
                            completed: *done,
                            total,
                            current: file_path,
                        });
                    }

                    outcome
                })
                .collect()
        });

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Batch finished: {} succeeded, {} failed",
            total - failed,
            failed
        );
        outcomes
    }
}

//! Analysis orchestration: the engine, its batch runner, lifecycle events
//! and the CLI pipeline built on top of them.

pub mod batch;
pub mod engine;
pub mod events;
pub mod run;

pub use batch::{BatchOutcome, BatchProgress};
pub use engine::{path_key, AnalyzerEngine, EngineBuilder, PassResults};
pub use events::{AnalysisEvent, EventBus};
pub use run::{run, PipelineResult};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a file is in its analysis
///
/// `Idle -> Decoding -> Analyzing -> Persisting -> Done`, or `Failed` from
/// any working stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Idle,
    Decoding,
    Analyzing,
    Persisting,
    Done,
    Failed,
}

impl AnalysisStage {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStage::Idle => "idle",
            AnalysisStage::Decoding => "decoding",
            AnalysisStage::Analyzing => "analyzing",
            AnalysisStage::Persisting => "persisting",
            AnalysisStage::Done => "done",
            AnalysisStage::Failed => "failed",
        }
    }

    /// True for `Done` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStage::Done | AnalysisStage::Failed)
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

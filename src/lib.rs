//! djtagger - offline audio analysis and tagging for DJs
//!
//! Derives tempo, major key (with Camelot notation), energy and dynamics,
//! approximate loudness, structural markers and content descriptors from
//! audio files, and caches them in SQLite keyed by path with content-hash
//! change detection.
//!
//! # Architecture
//!
//! - `config`: CLI arguments, runtime settings and analyzer parameters
//! - `discovery`: file scanning and content hashing
//! - `audio`: PCM decoding using symphonia
//! - `analysis`: the individual analyzer passes and tag reading
//! - `store`: the SQLite result store
//! - `pipeline`: the analyzer engine, batch runner, events and CLI pipeline
//! - `export`: JSON export of stored results
//!
//! # Example
//!
//! ```no_run
//! use djtagger::config::AnalysisConfig;
//! use djtagger::pipeline::AnalyzerEngine;
//! use djtagger::store::SqliteResultStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteResultStore::open("djtagger.db").expect("open store"));
//! let engine = AnalyzerEngine::builder(AnalysisConfig::default(), store)
//!     .build()
//!     .expect("build engine");
//! let result = engine.analyze(Path::new("track.flac")).expect("analysis failed");
//! println!("{:?} BPM, key {:?}", result.bpm, result.camelot_key);
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod store;
pub mod types;

// Re-export key types at crate root
pub use error::{EngineError, Result};
pub use pipeline::{AnalysisEvent, AnalysisStage, AnalyzerEngine, BatchOutcome, BatchProgress};
pub use store::{ResultStore, SqliteResultStore};
pub use types::{AnalysisResult, AudioBuffer, HotCue, KeyResult, TempoResult, ANALYSIS_VERSION};

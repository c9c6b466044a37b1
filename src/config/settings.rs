//! Runtime configuration settings

use super::analysis::AnalysisConfig;
use crate::error::Result;
use std::path::PathBuf;

/// Runtime settings for the analysis pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file or directory)
    pub input: PathBuf,
    /// SQLite database path
    pub db_path: PathBuf,
    /// Analyzer parameters
    pub analysis: AnalysisConfig,
    /// Number of files analyzed concurrently
    pub batch_workers: usize,
    /// Threads used for the per-file analyzer passes
    pub pass_threads: usize,
    /// Scan recursively
    pub recursive: bool,
    /// Re-analyze rows that are still fresh
    pub force: bool,
    /// Optional JSON export path
    pub json_output: Option<PathBuf>,
    /// Show progress bars
    pub show_progress: bool,
    /// Dry run mode - show files without processing
    pub dry_run: bool,
}

impl Settings {
    /// Create settings from CLI arguments, loading the analysis config file if given
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        let analysis = match &cli.config {
            Some(path) => AnalysisConfig::from_toml_file(path)?,
            None => AnalysisConfig::default(),
        };

        let default_workers = num_cpus::get().saturating_sub(1).max(1);

        Ok(Self {
            input: cli.input.clone(),
            db_path: cli.db.clone(),
            analysis,
            batch_workers: cli.threads.unwrap_or(default_workers).max(1),
            pass_threads: default_pass_threads(),
            recursive: cli.recursive,
            force: cli.force,
            json_output: cli.json.clone(),
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
        })
    }
}

/// Six passes run per file; more threads than that never help
fn default_pass_threads() -> usize {
    num_cpus::get().clamp(1, 6)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            db_path: PathBuf::from("djtagger.db"),
            analysis: AnalysisConfig::default(),
            batch_workers: num_cpus::get().saturating_sub(1).max(1),
            pass_threads: default_pass_threads(),
            recursive: true,
            force: false,
            json_output: None,
            show_progress: true,
            dry_run: false,
        }
    }
}

//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// djtagger - offline audio analysis for DJs
///
/// Analyzes audio files for BPM, key, energy, loudness, structure and content
/// descriptors, and caches the results in a SQLite database keyed by path.
#[derive(Parser, Debug)]
#[command(name = "djtagger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input path (file or directory)
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// SQLite database holding analysis results
    #[arg(long, value_name = "FILE", default_value = "djtagger.db")]
    pub db: PathBuf,

    /// TOML file with analyzer parameters (sample rate, BPM range, windows)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of files analyzed concurrently (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Scan subdirectories recursively
    #[arg(short, long, default_value = "true")]
    pub recursive: bool,

    /// Re-analyze files even when the stored row is up to date
    #[arg(long, default_value = "false")]
    pub force: bool,

    /// Also export every analyzed track to this JSON file
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bars)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Dry run - list files that would be analyzed without processing
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

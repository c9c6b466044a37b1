//! The CLI pipeline
//!
//! Scans the input, skips files whose stored row is still fresh, batch
//! analyzes the rest with a progress bar and optionally exports the whole
//! store as JSON.

use super::batch::BatchProgress;
use super::engine::AnalyzerEngine;
use crate::audio::SymphoniaSource;
use crate::config::Settings;
use crate::discovery::{self, DiscoveredFile};
use crate::error::Result;
use crate::export;
use crate::store::{ResultStore, SqliteResultStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Pipeline result summary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    /// Files whose stored row was fresh (or all files in a dry run)
    pub skipped: usize,
    /// Rows written to the JSON export, if one was requested
    pub exported: Option<usize>,
}

/// Run the full analysis pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    info!("Scanning for audio files...");
    let files = discovery::scan(&settings.input, settings.recursive)?;

    if settings.dry_run {
        return Ok(run_dry_run(&files, settings));
    }

    let store = Arc::new(SqliteResultStore::open(&settings.db_path)?);
    let engine = AnalyzerEngine::builder(settings.analysis.clone(), store.clone())
        .pcm_source(Arc::new(SymphoniaSource::new(settings.analysis.sample_rate)))
        .pass_threads(settings.pass_threads)
        .batch_workers(settings.batch_workers)
        .build()?;

    let mut to_analyze: Vec<PathBuf> = Vec::with_capacity(files.len());
    for file in &files {
        if settings.force || engine.is_stale(&file.path)? {
            to_analyze.push(file.path.clone());
        } else {
            debug!("Skipping {} (up to date)", file.path.display());
        }
    }

    let skipped = files.len() - to_analyze.len();
    if skipped > 0 {
        info!(
            "Skipping {} up-to-date files (use --force to re-analyze)",
            skipped
        );
    }

    let mut summary = PipelineResult {
        total_files: files.len(),
        skipped,
        ..PipelineResult::default()
    };

    if !to_analyze.is_empty() {
        let analysis_start = Instant::now();
        let progress_bar = settings.show_progress.then(|| {
            let pb = ProgressBar::new(to_analyze.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb
        });

        let on_progress = |p: BatchProgress| {
            if let Some(pb) = &progress_bar {
                pb.set_position(p.completed as u64);
                pb.set_message(file_name(&p.current));
            }
        };
        let outcomes = engine.batch_analyze(&to_analyze, Some(&on_progress));

        if let Some(pb) = &progress_bar {
            pb.finish_with_message("Analysis complete");
        }

        for outcome in &outcomes {
            match outcome {
                super::BatchOutcome::Success { .. } => summary.successful += 1,
                super::BatchOutcome::Failure { file_path, error } => {
                    error!("{}: {}", file_path, error);
                    summary.failed += 1;
                }
            }
        }

        let elapsed = analysis_start.elapsed().as_secs_f64();
        info!(
            "Analysis completed in {:.2}s ({:.1} tracks/sec)",
            elapsed,
            if elapsed > 0.0 { to_analyze.len() as f64 / elapsed } else { 0.0 }
        );
    } else {
        info!("All files up to date, nothing to analyze");
    }

    if let Some(json_path) = &settings.json_output {
        let rows = store.all()?;
        export::write_json(&rows, json_path)?;
        summary.exported = Some(rows.len());
    }

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(summary)
}

fn file_name(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// List what would be analyzed, grouped by directory, without touching the store
fn run_dry_run(files: &[DiscoveredFile], settings: &Settings) -> PipelineResult {
    println!();
    println!("=== DRY RUN MODE ===");
    println!();

    let mut by_directory: BTreeMap<PathBuf, Vec<&DiscoveredFile>> = BTreeMap::new();
    let mut by_format: BTreeMap<String, usize> = BTreeMap::new();
    for file in files {
        let dir = file.path.parent().unwrap_or(&file.path).to_path_buf();
        by_directory.entry(dir).or_default().push(file);
        *by_format.entry(format!("{:?}", file.format).to_uppercase()).or_default() += 1;
    }

    for (dir, dir_files) in &by_directory {
        println!("{}/ ({} files)", dir.display(), dir_files.len());
        for file in dir_files {
            println!("  {}", file_name(&file.path.to_string_lossy()));
        }
        println!();
    }

    let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
    println!(
        "Would analyze up to {} files ({:.1} MB):",
        files.len(),
        total_bytes as f64 / (1024.0 * 1024.0)
    );
    for (format, count) in &by_format {
        println!("  {} {} files", count, format);
    }
    println!();
    println!("Results database: {}", settings.db_path.display());
    if let Some(json) = &settings.json_output {
        println!("JSON export:      {}", json.display());
    }
    println!();

    PipelineResult {
        total_files: files.len(),
        skipped: files.len(),
        ..PipelineResult::default()
    }
}

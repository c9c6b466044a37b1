//! djtagger CLI entry point

use clap::Parser;
use djtagger::config::{Cli, Settings};
use djtagger::pipeline;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(&cli);

    if !cli.input.exists() {
        eprintln!(
            "Error: Input path does not exist: {}\n\n  Tip: Check the path is correct and accessible.\n  Examples:\n    djtagger -i ~/Music/DJ --db library.db\n    djtagger -i ./track.mp3 --json ./track.json",
            cli.input.display()
        );
        return ExitCode::FAILURE;
    }

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&settings) {
        Ok(result) => {
            println!();
            println!(
                "Summary: {} analyzed, {} failed, {} up to date (of {} total)",
                result.successful, result.failed, result.skipped, result.total_files
            );
            if let (Some(count), Some(path)) = (result.exported, &settings.json_output) {
                println!("Exported {} tracks to {}", count, path.display());
            }

            if result.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

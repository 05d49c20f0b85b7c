//! CLI entry point for the Photobucket downloader.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use photobucket_core::events::EventSink;
use photobucket_core::{LineScanExtractor, Orchestrator};
use tracing::{debug, error, info};

mod cli;
mod progress;

use cli::Args;
use progress::ProgressEvents;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = args.to_run_config();
    if config.simulate {
        info!("dry run: media downloads are skipped");
    }

    let events = Arc::new(ProgressEvents::new(!args.quiet));
    let sink: Arc<dyn EventSink> = events.clone();
    let orchestrator = Orchestrator::new(config, Box::new(LineScanExtractor::new()), sink);

    let result = orchestrator.run().await;
    events.finish();

    match result {
        Ok(summary) if summary.albums_failed > 0 => {
            error!(failed = summary.albums_failed, "some subalbums could not be downloaded");
            Ok(ExitCode::FAILURE)
        }
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %e, "run failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

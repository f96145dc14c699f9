//! Ocean instrument data ingester.
//!
//! Matches raw instrument files against the configured pipelines and writes
//! each one as time-chunked NetCDF files into datastream storage.

mod config;
mod config_loader;
mod ingest;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::IngesterConfig;
use ingest::{collect_inputs, IngestionPipeline};

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Ingest raw ocean instrument files into chunked NetCDF datastreams")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "INGESTER_CONFIG", default_value = "config/ingester.yaml")]
    config: PathBuf,

    /// Override the storage root from the configuration
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Directory to scan (recursively) for input files
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Input files
    files: Vec<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Starting ocean data ingester");

    // Load configuration
    let mut config = IngesterConfig::from_yaml(&args.config)?;
    if let Some(root) = args.storage_root {
        config.storage.root = root;
    }
    info!(
        config = %args.config.display(),
        storage_root = %config.storage.root.display(),
        pipelines = ?config.pipelines.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "Loaded configuration"
    );

    let inputs = collect_inputs(&args.files, args.input_dir.as_deref())?;
    if inputs.is_empty() {
        error!("No input files given; pass files or --input-dir");
        return Ok(ExitCode::from(2));
    }

    let pipeline = IngestionPipeline::new(&config)?;
    let report = pipeline.run(&inputs);

    match pipeline.storage().stats() {
        Ok(stats) => info!(
            files = stats.file_count,
            bytes = stats.total_size,
            root = %stats.root,
            "Storage summary"
        ),
        Err(e) => error!(error = %e, "Could not read storage statistics"),
    }

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        for failed in &report.failed {
            error!(
                file = %failed.path.display(),
                window = failed.window.map(tracing::field::display),
                error = %failed.message,
                "Failed input"
            );
        }
        Ok(ExitCode::FAILURE)
    }
}

//! Mekong Gauge Service - command line entry point
//!
//! `run` processes one batch of upstream readings into per-station results,
//! writes the latest snapshot and appends the history log. `serve` exposes
//! the most recent snapshot over a read-only HTTP API.
//!
//! Usage:
//!   cargo run --release -- run --input batch.json
//!   cargo run --release -- run --demo --workers 4
//!   cargo run --release -- serve --port 8080
//!
//! Environment:
//!   MEKONG_STATIONS_CONFIG - path to stations.toml (default: ./stations.toml)
//!   RUST_LOG               - tracing filter (default: info)

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use mekong_gauge_service::config::{config_path, load_config, load_config_from, ServiceConfig};
use mekong_gauge_service::endpoint::{start_endpoint_server, EndpointSources};
use mekong_gauge_service::ingest::fixtures::synthetic_batches;
use mekong_gauge_service::ingest::raw::{parse_batches, RawBatches};
use mekong_gauge_service::logging::TracingLog;
use mekong_gauge_service::pipeline::{ProcessingSettings, StationProcessor};
use mekong_gauge_service::snapshot::{append_history, write_latest, Snapshot};
use mekong_gauge_service::stations::StationRegistry;

/// Hours of synthetic readings generated by `run --demo`.
const DEMO_HOURS: usize = 72;

#[derive(Parser)]
#[command(name = "mekong_gauge_service", version, about = "Mekong delta water level analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one batch and persist the snapshot.
    Run(RunArgs),
    /// Serve the latest snapshot over HTTP.
    Serve(ServeArgs),
}

#[derive(Args)]
struct RunArgs {
    /// JSON document mapping station id to raw batch.
    #[arg(long, conflicts_with = "demo", required_unless_present = "demo")]
    input: Option<PathBuf>,
    /// Use synthetic tidal batches instead of an input file.
    #[arg(long, default_value_t = false)]
    demo: bool,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Snapshot path (default: service.snapshot_path).
    #[arg(long)]
    output: Option<PathBuf>,
    /// History CSV path (default: service.history_path).
    #[arg(long)]
    history: Option<PathBuf>,
    /// Worker threads; 1 processes stations sequentially.
    #[arg(long, default_value_t = 1)]
    workers: usize,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    port: u16,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Snapshot path (default: service.snapshot_path).
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    // A subscriber may already be installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn load(config: Option<&Path>) -> Result<ServiceConfig, String> {
    let loaded = match config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            load_config_from(path)
        }
        None => {
            tracing::info!("Loading configuration from {}", config_path().display());
            load_config()
        }
    };
    loaded.map_err(|e| e.to_string())
}

fn run(args: RunArgs) -> Result<(), String> {
    let config = load(args.config.as_deref())?;
    let settings = ProcessingSettings::from_service(&config.service).map_err(|e| e.to_string())?;
    let registry = StationRegistry::from_configs(config.stations);
    tracing::info!("{} stations configured", registry.len());

    let processor = StationProcessor::new(registry, settings, Arc::new(TracingLog));

    let batches: RawBatches = match &args.input {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            parse_batches(&json).map_err(|e| e.to_string())?
        }
        None => {
            tracing::info!("Generating {} hours of synthetic readings", DEMO_HOURS);
            synthetic_batches(processor.registry(), Utc::now(), DEMO_HOURS)
        }
    };

    let generated_at = processor.now();
    let results = if args.workers > 1 {
        processor.process_all_parallel_at(batches, args.workers, generated_at)
    } else {
        processor.process_all_at(&batches, generated_at)
    };

    let snapshot = Snapshot::new(results, processor.settings(), generated_at);

    let output = args.output.unwrap_or(config.service.snapshot_path);
    write_latest(&output, &snapshot).map_err(|e| e.to_string())?;
    tracing::info!("Snapshot written to {}", output.display());

    let history = args.history.unwrap_or(config.service.history_path);
    let rows = append_history(&history, &snapshot).map_err(|e| e.to_string())?;
    tracing::info!("Appended {} rows to {}", rows, history.display());

    Ok(())
}

fn serve(args: ServeArgs) -> Result<(), String> {
    let config = load(args.config.as_deref())?;
    let registry = StationRegistry::from_configs(config.stations);
    let sources = EndpointSources {
        snapshot_path: args.snapshot.unwrap_or(config.service.snapshot_path),
        history_path: config.service.history_path,
    };
    start_endpoint_server(args.port, &registry, &sources)
}

fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Serve(args) => serve(args),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

//! CLI entry point for the fleetml pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use fleet_pipeline::{LocalStore, PipelineSettings, PredictPipeline, TrainPipeline};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fleetml", about = "Batch ML pipeline for vehicle predictive maintenance")]
struct Cli {
    /// Path to the TOML settings file.
    #[arg(short, long, default_value = "fleetml.toml")]
    config: PathBuf,

    /// Log level when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate, preprocess, cluster, and train per-cluster models.
    Train,
    /// Score a new batch against the persisted models.
    Predict,
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let settings = PipelineSettings::from_file(&cli.config)
        .map_err(|e| anyhow!("could not load settings: {e}"))?;
    let store = LocalStore::new(&settings.store_dir);
    let location = store.root().display().to_string();

    match cli.command {
        Command::Train => {
            let outcome = TrainPipeline::new(settings, store)
                .run()
                .map_err(|e| anyhow!("training failed [{}]: {e}", e.error_code()))?;
            println!(
                "training succeeded: {} clusters, {} models trained, {} skipped",
                outcome.cluster_count,
                outcome.trained.len(),
                outcome.skipped.len()
            );
        }
        Command::Predict => {
            let outcome = PredictPipeline::new(settings, store, location)
                .run()
                .map_err(|e| anyhow!("prediction failed [{}]: {e}", e.error_code()))?;
            println!(
                "prediction succeeded: wrote {} in {}, sample: {}",
                outcome.output_key, outcome.output_location, outcome.sample_json
            );
        }
    }

    Ok(())
}

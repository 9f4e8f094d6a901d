//! payspool: drains a filesystem payload queue through an external worker.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use payspool::config::Config;
use payspool::queue::QueueSnapshot;
use payspool::run::run_once;

/// Filesystem payload queue driver.
#[derive(Parser, Debug)]
#[command(name = "payspool")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Validate configuration and print the queue without processing.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "could not load configuration");
            return ExitCode::FAILURE;
        }
    };

    if args.dry_run {
        return dry_run(&config);
    }

    match run_once(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "tick failed");
            ExitCode::FAILURE
        }
    }
}

fn dry_run(config: &Config) -> ExitCode {
    info!("dry run: configuration is valid");
    info!(inbound = %config.paths.inbound.display());
    info!(worker = %config.worker.command.join(" "));

    match QueueSnapshot::capture(&config.paths.inbound) {
        Ok(snapshot) => {
            info!(queued = snapshot.len(), "queue snapshot");
            for name in snapshot.file_names() {
                info!(%name, "queued payload");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!(%error, "could not read inbound directory");
            ExitCode::FAILURE
        }
    }
}

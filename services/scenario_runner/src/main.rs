//! SimpleFIX scenario runner entry point

use anyhow::{Context, Result};
use clap::Parser;
use runner_config::DEFAULT_CONFIG_FILE;
use scenario_runner::{app, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "simplefixclient", author, version, about, long_about = None)]
struct Args {
    /// Engine configuration file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with status 2 before anything else happens.
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SimpleFIX scenario runner");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(summary) if summary.all_passed() => {
            info!("All sessions passed");
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            error!(failed = summary.failed, "Some sessions failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("simplefixclient: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<RunSummary> {
    info!("Configuration file: {}", args.config.display());
    app::run(&args.config)
        .await
        .with_context(|| format!("Run with {} aborted", args.config.display()))
}

//! videohelper command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use video_helper::adapters::init_logging;
use video_helper::cli::{commands, Cli};

/// Main entry point for the videohelper CLI
fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli)?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!(
        output_dir = %config.output_dir.display(),
        workers = config.worker_count(),
        strategy = %config.strategy,
        "Starting videohelper"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(commands::run(cli.command, config))
}

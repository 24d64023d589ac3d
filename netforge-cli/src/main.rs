//! ## netforge-cli
//! **Command-line frontend**
//! Builds topologies from device records, analyzes them and runs
//! deterministic lifecycle simulations.

use clap::Parser;
use netforge_telemetry::{EventLogger, MetricsRecorder};

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli)?;
    EventLogger::init(&config.telemetry.log_level, config.telemetry.json);
    let metrics = if config.telemetry.metrics {
        Some(MetricsRecorder::new()?)
    } else {
        None
    };

    commands::run_command(cli.command, &config, metrics).await
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use netforge_config::NetforgeConfig;
use netforge_engine::{
    run_analysis_mode, run_fuzz_mode, run_simulation_mode, run_topology_mode, ScenarioSource,
    SimulationRequest,
};
use netforge_simulator::Completion;
use netforge_telemetry::MetricsRecorder;

#[derive(Parser, Debug)]
#[command(name = "netforge", version, about)]
pub struct Cli {
    /// Configuration file layered over the defaults; without it,
    /// `config/netforge.yaml` and `NETFORGE_*` variables are used.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the topology from device records and print it as JSON
    Topology(InputArgs),
    /// Analyze the topology for bottlenecks and single points of failure
    Analyze(InputArgs),
    /// Run a Day-1 or Day-2 lifecycle simulation
    Simulate(SimulateArgs),
    /// Run generated Day-2 scenarios over a range of seeds, twice each, and
    /// flag any seed whose runs differ
    Fuzz(FuzzArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Device records (.json, .yaml or .yml)
    #[arg(short, long)]
    pub devices: PathBuf,
    /// Write output here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Day-2 scenario script; implies `--day 2`
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
    /// 1 brings the network up; 2 also runs a script, generated from the
    /// analysis when no scenario file is given
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub day: u8,
    /// How long generated Day-2 scripts keep each link down
    #[arg(long, default_value_t = 100)]
    pub hold_ms: u64,
    #[arg(long)]
    pub seed: Option<u64>,
    /// Fail unless the run's fingerprint equals this hex digest
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Write Prometheus metrics of the run to this file
    #[arg(long)]
    pub metrics_output: Option<PathBuf>,
    /// Save the Day-2 script that was run
    #[arg(long)]
    pub save_scenario: Option<PathBuf>,
    /// Directory for failure reports
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,
}

impl SimulateArgs {
    pub fn scenario_source(&self) -> ScenarioSource {
        match (&self.scenario, self.day) {
            (Some(path), _) => ScenarioSource::File(path.clone()),
            (None, 2) => ScenarioSource::Generated {
                hold_ms: self.hold_ms,
            },
            (None, _) => ScenarioSource::Day1,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FuzzArgs {
    /// Device records (.json, .yaml or .yml)
    #[arg(short, long)]
    pub devices: PathBuf,
    /// First seed of the sweep
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
    /// Number of seeds to try
    #[arg(long, default_value_t = 10)]
    pub iterations: usize,
    /// Chance per round of corrupting a random frame
    #[arg(long, default_value_t = 0.01)]
    pub fault_probability: f64,
    /// Directory for failure reports
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,
}

pub fn load_config(cli: &Cli) -> Result<NetforgeConfig> {
    let config = match &cli.config {
        Some(path) => NetforgeConfig::load_from_path(path)?,
        None => NetforgeConfig::load()?,
    };
    Ok(config)
}

pub async fn run_command(
    command: Commands,
    config: &NetforgeConfig,
    metrics: Option<MetricsRecorder>,
) -> Result<()> {
    match command {
        Commands::Topology(args) => {
            run_topology_mode(&args.devices, args.output.as_deref(), config).await?;
        }
        Commands::Analyze(args) => {
            run_analysis_mode(&args.devices, args.output.as_deref(), config).await?;
        }
        Commands::Simulate(args) => {
            let mut request = SimulationRequest::new(&args.input.devices, args.scenario_source());
            request.seed = args.seed;
            request.validate_hash = args.validate_hash;
            request.output = args.input.output;
            request.metrics_output = args.metrics_output;
            request.save_scenario = args.save_scenario;
            request.report_dir = args.report_dir;

            let result = run_simulation_mode(request, config, metrics).await?;
            if result.completion != Completion::Complete {
                info!(
                    completion = ?result.completion,
                    failed = ?result.failed_devices(),
                    "Simulation ended before completion"
                );
            }
        }
        Commands::Fuzz(args) => {
            let summary = run_fuzz_mode(
                &args.devices,
                args.seed,
                args.iterations,
                args.fault_probability,
                &args.report_dir,
                config,
            )
            .await?;
            if !summary.mismatches.is_empty() {
                anyhow::bail!(
                    "{} seed(s) produced diverging runs: {:?}",
                    summary.mismatches.len(),
                    summary.mismatches
                );
            }
            info!(runs = summary.runs, "Fuzz sweep found no divergence");
        }
    }
    Ok(())
}

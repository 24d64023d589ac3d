/*!
# Runtime Engine

Shared implementation of the topology, analysis, simulation and fuzz modes,
so every frontend loads inputs, runs the simulator, reports hash mismatches
and writes results the same way.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use netforge_config::{AnalysisConfig, LinkPolicy, NetforgeConfig, TopologyConfig};
use netforge_core::analysis::{AnalysisReport, AnalyzerSettings, NetworkAnalyzer};
use netforge_core::model::load_devices;
use netforge_core::topology::{SubnetLinkPolicy, Topology, TopologyBuilder};
use netforge_simulator::{Scenario, ScenarioScript, SimulationEngine, SimulationResult};
use netforge_telemetry::{EventLogger, MetricsRecorder};

/// Where a simulation's scenario comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioSource {
    Day1,
    /// Day-2 script derived from the analysis of the loaded topology.
    Generated { hold_ms: u64 },
    /// Day-2 script read from a YAML or JSON file.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub devices: PathBuf,
    pub scenario: ScenarioSource,
    /// Overrides the configured seed.
    pub seed: Option<u64>,
    /// Expected fingerprint; a mismatch fails the run and writes a report.
    pub validate_hash: Option<String>,
    pub output: Option<PathBuf>,
    pub metrics_output: Option<PathBuf>,
    /// Where to write the Day-2 script that was run, for replaying it.
    pub save_scenario: Option<PathBuf>,
    pub report_dir: PathBuf,
}

impl SimulationRequest {
    pub fn new(devices: impl Into<PathBuf>, scenario: ScenarioSource) -> Self {
        Self {
            devices: devices.into(),
            scenario,
            seed: None,
            validate_hash: None,
            output: None,
            metrics_output: None,
            save_scenario: None,
            report_dir: PathBuf::from("."),
        }
    }
}

/// Outcome of a fuzz sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FuzzSummary {
    pub runs: usize,
    pub mismatches: Vec<u64>,
    pub timed_out: Vec<u64>,
    pub actor_faults: usize,
}

pub fn link_policy(config: &TopologyConfig) -> SubnetLinkPolicy {
    match config.link_policy {
        LinkPolicy::FullMesh => SubnetLinkPolicy::FullMesh,
        LinkPolicy::HubAndSpoke => SubnetLinkPolicy::HubAndSpoke,
    }
}

pub fn analyzer_settings(config: &AnalysisConfig) -> AnalyzerSettings {
    AnalyzerSettings {
        utilization_threshold: config.utilization_threshold,
        critical_utilization: config.critical_utilization,
        demand_unit_bps: config.demand_unit_bps,
    }
}

pub fn load_topology(devices: &Path, config: &NetforgeConfig) -> Result<Topology> {
    let records = load_devices(devices)
        .with_context(|| format!("loading devices from {}", devices.display()))?;
    let topology = TopologyBuilder::new(link_policy(&config.topology)).build(&records);
    info!(
        devices = topology.devices.len(),
        links = topology.links.len(),
        isolated = topology.isolated.len(),
        "Topology built"
    );
    Ok(topology)
}

/// Builds the topology and writes it as JSON.
#[instrument(level = "info", name = "run_topology_mode", skip(config))]
pub async fn run_topology_mode(
    devices: &Path,
    output: Option<&Path>,
    config: &NetforgeConfig,
) -> Result<Topology> {
    let topology = load_topology(devices, config)?;
    write_json(&topology, output)?;
    EventLogger::log_event(
        "topology_built",
        vec![
            KeyValue::new("devices", topology.devices.len() as i64),
            KeyValue::new("links", topology.links.len() as i64),
            KeyValue::new("subnets", topology.subnets.len() as i64),
            KeyValue::new("isolated", topology.isolated.len() as i64),
        ],
    )
    .await;
    Ok(topology)
}

/// Builds and analyzes the topology and writes the report as JSON.
#[instrument(level = "info", name = "run_analysis_mode", skip(config))]
pub async fn run_analysis_mode(
    devices: &Path,
    output: Option<&Path>,
    config: &NetforgeConfig,
) -> Result<AnalysisReport> {
    let topology = load_topology(devices, config)?;
    let report = NetworkAnalyzer::new(analyzer_settings(&config.analysis)).analyze(&topology);
    write_json(&report, output)?;
    EventLogger::log_event(
        "analysis_complete",
        vec![
            KeyValue::new("issues", report.issues.len() as i64),
            KeyValue::new("recommendations", report.recommendations.len() as i64),
            KeyValue::new(
                "articulation_points",
                report.articulation_points.len() as i64,
            ),
        ],
    )
    .await;
    Ok(report)
}

/// Runs one simulation on a blocking thread. Ctrl-C stops the run after the
/// current round and still returns the partial result.
#[instrument(level = "info", name = "run_simulation_mode", skip(config, metrics))]
pub async fn run_simulation_mode(
    request: SimulationRequest,
    config: &NetforgeConfig,
    metrics: Option<MetricsRecorder>,
) -> Result<SimulationResult> {
    let topology = load_topology(&request.devices, config)?;
    let scenario = resolve_scenario(&request.scenario, &topology, config)?;
    if let (Scenario::Day2(script), Some(path)) = (&scenario, &request.save_scenario) {
        save_scenario(script, path)?;
    }

    let mut sim_config = config.simulator.clone();
    if let Some(seed) = request.seed {
        sim_config.seed = seed;
    }
    let seed = sim_config.seed;

    let mut engine = SimulationEngine::new(&topology, sim_config);
    if let Some(metrics) = metrics.clone() {
        engine = engine.with_metrics(metrics);
    }
    let controller = engine.controller();
    let task_scenario = scenario.clone();
    let mut handle = tokio::task::spawn_blocking(move || engine.run(&task_scenario));

    let joined = tokio::select! {
        joined = &mut handle => joined,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, stopping simulation");
            controller.stop();
            handle.await
        }
    };
    let result = joined.context("simulation task failed")??;

    info!(
        scenario = %result.scenario,
        completion = ?result.completion,
        fingerprint = %result.fingerprint,
        "Simulation complete"
    );

    if let Some(expected) = request.validate_hash.as_deref() {
        if result.fingerprint != expected {
            let report = format!(
                "Simulation error: fingerprint mismatch!\nScenario: {}\nSeed: {}\nExpected: {}\nGot: {}\nCompletion: {:?}\nEvents: {}\n",
                result.scenario,
                seed,
                expected,
                result.fingerprint,
                result.completion,
                result.events.len()
            );
            let path = generate_failure_report(&request.report_dir, &report)?;
            bail!(
                "fingerprint mismatch (expected {expected}, got {}); report written to {}",
                result.fingerprint,
                path.display()
            );
        }
    }

    write_json(&result, request.output.as_deref())?;
    if let (Some(metrics), Some(path)) = (&metrics, &request.metrics_output) {
        let text = metrics.gather_metrics().context("gathering metrics")?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    }

    EventLogger::log_event(
        "simulation_complete",
        vec![
            KeyValue::new("scenario", result.scenario.clone()),
            KeyValue::new("seed", seed.to_string()),
            KeyValue::new("completion", format!("{:?}", result.completion)),
            KeyValue::new("events", result.events.len() as i64),
            KeyValue::new("actor_faults", result.actor_faults.len() as i64),
            KeyValue::new("fingerprint", result.fingerprint.clone()),
        ],
    )
    .await;
    Ok(result)
}

/// Runs the generated Day-2 scenario twice per seed with random chaos and
/// reports every seed whose two runs disagree.
#[instrument(level = "info", name = "run_fuzz_mode", skip(config))]
pub async fn run_fuzz_mode(
    devices: &Path,
    start_seed: u64,
    iterations: usize,
    fault_probability: f64,
    report_dir: &Path,
    config: &NetforgeConfig,
) -> Result<FuzzSummary> {
    let topology = load_topology(devices, config)?;
    let scenario = resolve_scenario(&ScenarioSource::Generated { hold_ms: 100 }, &topology, config)?;
    let mut summary = FuzzSummary::default();

    for seed in start_seed..start_seed.saturating_add(iterations as u64) {
        let mut sim_config = config.simulator.clone().with_seed(seed);
        sim_config.chaos.enabled = true;
        sim_config.chaos.fault_probability = fault_probability;

        let first = run_blocking(&topology, &scenario, sim_config.clone()).await?;
        let second = run_blocking(&topology, &scenario, sim_config).await?;
        summary.runs += 2;
        summary.actor_faults += first.actor_faults.len();
        if !first.is_complete() {
            summary.timed_out.push(seed);
        }
        if first.fingerprint != second.fingerprint {
            error!(seed, "Runs with the same seed diverged");
            let report = format!(
                "Fuzz error: non-deterministic run!\nSeed: {}\nFirst: {}\nSecond: {}\nEvents: {} vs {}\n",
                seed,
                first.fingerprint,
                second.fingerprint,
                first.events.len(),
                second.events.len()
            );
            generate_failure_report(report_dir, &report)?;
            summary.mismatches.push(seed);
        }
    }

    EventLogger::log_event(
        "fuzz_complete",
        vec![
            KeyValue::new("runs", summary.runs as i64),
            KeyValue::new("mismatches", summary.mismatches.len() as i64),
            KeyValue::new("actor_faults", summary.actor_faults as i64),
        ],
    )
    .await;
    Ok(summary)
}

async fn run_blocking(
    topology: &Topology,
    scenario: &Scenario,
    config: netforge_config::SimulatorConfig,
) -> Result<SimulationResult> {
    let topology = topology.clone();
    let scenario = scenario.clone();
    let result = tokio::task::spawn_blocking(move || {
        netforge_simulator::run(&topology, &scenario, config)
    })
    .await
    .context("simulation task failed")??;
    Ok(result)
}

fn resolve_scenario(
    source: &ScenarioSource,
    topology: &Topology,
    config: &NetforgeConfig,
) -> Result<Scenario> {
    match source {
        ScenarioSource::Day1 => Ok(Scenario::Day1),
        ScenarioSource::File(path) => Scenario::load(path)
            .with_context(|| format!("loading scenario from {}", path.display())),
        ScenarioSource::Generated { hold_ms } => {
            let settings = analyzer_settings(&config.analysis);
            let threshold = settings.utilization_threshold;
            let report = NetworkAnalyzer::new(settings).analyze(topology);
            Ok(Scenario::generated_day2(
                topology, &report, threshold, *hold_ms,
            ))
        }
    }
}

/// Writes a scenario script as YAML, for replaying a generated Day-2 run.
pub fn save_scenario(script: &ScenarioScript, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(script).context("serializing scenario")?;
    fs::write(path, yaml).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "Scenario saved");
    Ok(())
}

/// Writes `report` to a timestamped file in `dir` and returns its path.
pub fn generate_failure_report(dir: &Path, report: &str) -> Result<PathBuf> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("failure_report_{now}.txt"));
    fs::write(&path, report).with_context(|| format!("writing {}", path.display()))?;
    warn!(path = %path.display(), "Failure report written");
    Ok(path)
}

/// Pretty JSON to `path`, or to stdout without one.
fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    match path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "Output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

//! Simulation engine configuration.
//!
//! All durations are logical milliseconds on the simulation clock except
//! `round_deadline_ms` and `stop_grace_ms`, which bound wall-clock waits on
//! actor threads.

use std::path::{Path, PathBuf};

use figment::providers::{Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ConfigError;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[validate(schema(function = validate_timing))]
pub struct SimulatorConfig {
    /// Seed for every random decision in a run.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Logical length of one round.
    #[serde(default = "default_tick_ms")]
    #[validate(range(min = 1, max = 1000))]
    pub tick_ms: u64,

    /// A run that has not completed after this much logical time is
    /// returned as timed out.
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,

    /// Time between the start control and interfaces coming up.
    #[serde(default = "default_boot_ms")]
    pub boot_ms: u64,

    /// Retransmission interval for unacknowledged hellos.
    #[serde(default = "default_hello_interval_ms")]
    #[validate(range(min = 1))]
    pub hello_interval_ms: u64,

    /// Quiet period without route changes before a node is converged.
    #[serde(default = "default_convergence_window_ms")]
    #[validate(range(min = 1))]
    pub convergence_window_ms: u64,

    /// Quiet period without events that ends a Day-2 run.
    #[serde(default = "default_quiescence_window_ms")]
    #[validate(range(min = 1))]
    pub quiescence_window_ms: u64,

    /// Length of one link utilization sample.
    #[serde(default = "default_sample_interval_ms")]
    #[validate(range(min = 1))]
    pub sample_interval_ms: u64,

    /// Wall-clock budget for all actors to commit one round.
    #[serde(default = "default_round_deadline_ms")]
    #[validate(range(min = 1))]
    pub round_deadline_ms: u64,

    /// Wall-clock budget for actor threads to report after stop.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    #[serde(default)]
    #[validate(nested)]
    pub network: NetworkModelConfig,

    #[serde(default)]
    #[validate(nested)]
    pub chaos: ChaosConfig,
}

fn default_seed() -> u64 {
    42
}

fn default_tick_ms() -> u64 {
    1
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_boot_ms() -> u64 {
    5
}

fn default_hello_interval_ms() -> u64 {
    20
}

fn default_convergence_window_ms() -> u64 {
    30
}

fn default_quiescence_window_ms() -> u64 {
    100
}

fn default_sample_interval_ms() -> u64 {
    50
}

fn default_round_deadline_ms() -> u64 {
    5_000
}

fn default_stop_grace_ms() -> u64 {
    1_000
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            tick_ms: default_tick_ms(),
            timeout_ms: default_timeout_ms(),
            boot_ms: default_boot_ms(),
            hello_interval_ms: default_hello_interval_ms(),
            convergence_window_ms: default_convergence_window_ms(),
            quiescence_window_ms: default_quiescence_window_ms(),
            sample_interval_ms: default_sample_interval_ms(),
            round_deadline_ms: default_round_deadline_ms(),
            stop_grace_ms: default_stop_grace_ms(),
            network: NetworkModelConfig::default(),
            chaos: ChaosConfig::default(),
        }
    }
}

impl SimulatorConfig {
    /// Load only the simulator section from a standalone YAML file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::new()
            .merge(Yaml::file(path))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

fn validate_timing(config: &SimulatorConfig) -> Result<(), ValidationError> {
    if config.timeout_ms < config.tick_ms {
        return Err(ValidationError::new("timeout_shorter_than_tick"));
    }
    if config.hello_interval_ms < config.tick_ms {
        return Err(ValidationError::new("hello_interval_shorter_than_tick"));
    }
    Ok(())
}

/// Per-lane delivery conditions applied by the transport.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkModelConfig {
    /// Fixed one-way latency.
    pub latency_ms: u64,
    /// Maximum additional random delay.
    pub jitter_ms: u64,
    /// Probability of dropping a message in flight.
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    pub loss_probability: f64,
}

impl Default for NetworkModelConfig {
    fn default() -> Self {
        Self {
            latency_ms: 2,
            jitter_ms: 1,
            loss_probability: 0.0,
        }
    }
}

/// Fault injection.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct ChaosConfig {
    /// When false, scripted corruption actions are rejected.
    pub enabled: bool,
    /// Chance per round of corrupting the next message on a random lane.
    #[validate(range(min = 0.0, max = 1.0))]
    pub fault_probability: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fault_probability: 0.0,
        }
    }
}

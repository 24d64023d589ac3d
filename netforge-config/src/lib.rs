//! # Netforge Configuration System
//!
//! Hierarchical configuration for the topology builder, the analyzer, the
//! simulation engine and telemetry.
//!
//! ## Features
//! - **Layered sources**: defaults, base file, environment file, env vars
//! - **Validation**: field ranges and cross-field checks via `validator`

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod analysis;
mod error;
mod simulator;
mod telemetry;
mod topology;
mod validation;

pub use analysis::AnalysisConfig;
pub use error::ConfigError;
pub use simulator::{ChaosConfig, NetworkModelConfig, SimulatorConfig};
pub use telemetry::TelemetryConfig;
pub use topology::{LinkPolicy, TopologyConfig};

const ENV_PREFIX: &str = "NETFORGE_";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct NetforgeConfig {
    #[serde(default)]
    #[validate(nested)]
    pub topology: TopologyConfig,

    #[serde(default)]
    #[validate(nested)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    #[validate(nested)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl NetforgeConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/netforge.yaml`, if present
    /// 3. `config/<NETFORGE_ENV>.yaml`, if present
    /// 4. `NETFORGE_*` environment variables (`__` separates sections)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(NetforgeConfig::default()));

        if Path::new("config/netforge.yaml").exists() {
            figment = figment.merge(Yaml::file("config/netforge.yaml"));
        }

        let env = std::env::var("NETFORGE_ENV").unwrap_or_else(|_| "development".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::finish(figment)
    }

    /// Load from an explicit YAML or JSON file layered over the defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(NetforgeConfig::default()));
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Yaml::file(path)),
        };
        Self::finish(figment)
    }

    /// Parse an inline YAML document layered over the defaults, without
    /// consulting the environment.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(NetforgeConfig::default()))
            .merge(Yaml::string(yaml))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

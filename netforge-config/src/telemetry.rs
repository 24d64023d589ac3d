//! Logging and metrics settings.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[validate(custom(function = validation::validate_log_filter))]
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Record Prometheus counters during simulation runs.
    pub metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            json: false,
            metrics: true,
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Failed to spawn actor thread for {device}: {source}")]
    Spawn {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scenario file not found: {0}")]
    ScenarioNotFound(PathBuf),

    #[error("Unsupported scenario format: {0}")]
    UnsupportedFormat(String),

    #[error("Scenario YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Scenario JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A message an actor refused to process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActorError {
    #[error("corrupted payload on {link}")]
    CorruptedPayload { link: String },

    #[error("message on {link} claims sender {claimed}, expected {expected}")]
    UnexpectedSender {
        link: String,
        claimed: String,
        expected: String,
    },

    #[error("route metric {metric} at or beyond infinity")]
    MetricOutOfRange { metric: u8 },
}

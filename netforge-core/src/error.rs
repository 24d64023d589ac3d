use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading device records. Topology building and analysis
/// never fail; malformed records degrade to defaults or isolated devices.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Device file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported device file format: {0}")]
    UnsupportedFormat(String),

    #[error("Device JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Device YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

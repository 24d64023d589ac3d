//! Network analyzer thresholds.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[validate(schema(function = validate_thresholds))]
#[serde(default)]
pub struct AnalysisConfig {
    /// Estimated utilization above which a link gets a recommendation.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub utilization_threshold: f64,

    /// Utilization above which the recommendation becomes HIGH priority.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub critical_utilization: f64,

    /// Traffic assumed per access device, in bits per second.
    #[validate(range(min = 1))]
    pub demand_unit_bps: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            utilization_threshold: 0.70,
            critical_utilization: 0.90,
            demand_unit_bps: 25_000_000,
        }
    }
}

fn validate_thresholds(config: &AnalysisConfig) -> Result<(), ValidationError> {
    if config.critical_utilization < config.utilization_threshold {
        return Err(ValidationError::new("critical_below_threshold"));
    }
    Ok(())
}

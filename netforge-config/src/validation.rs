//! Custom validation functions shared by the configuration sections.

use validator::ValidationError;

fn matches(pattern: &str, value: &str, code: &'static str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(pattern).map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(code))
    }
}

/// A `tracing` level or a full `EnvFilter` directive list.
pub fn validate_log_filter(filter: &str) -> Result<(), ValidationError> {
    matches(
        r"(?i)^(trace|debug|info|warn|error|off)$|^[a-z_][a-z0-9_:]*=(trace|debug|info|warn|error|off)(,[a-z_][a-z0-9_:]*=(trace|debug|info|warn|error|off))*$",
        filter,
        "invalid_log_filter",
    )
}

//! Error types for configuration loading and validation

use std::path::PathBuf;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("Configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),
}

/// Flattens nested validator output into `section.field: message` lines.
fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    fn walk(errors: &ValidationErrors, prefix: &str, output: &mut String) {
        for (field, kind) in errors.errors() {
            let path = if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{prefix}.{field}")
            };
            match kind {
                validator::ValidationErrorsKind::Field(list) => {
                    for error in list {
                        let message = match &error.message {
                            Some(msg) => msg.to_string(),
                            None => error.code.to_string(),
                        };
                        let _ = writeln!(output, "  - {path}: {message}");
                    }
                }
                validator::ValidationErrorsKind::Struct(inner) => walk(inner, &path, output),
                validator::ValidationErrorsKind::List(items) => {
                    for (index, inner) in items {
                        walk(inner, &format!("{path}[{index}]"), output);
                    }
                }
            }
        }
    }

    let mut output = String::new();
    walk(errors, "", &mut output);
    output
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

//! Error types for the resolution engine and its own configuration.

use std::path::PathBuf;

use hostplane_config::RegistryError;
use hostplane_sources::SourceId;
use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Programming error in the parameter table. Fatal at startup.
    #[error("parameter registry is inconsistent: {0}")]
    Registry(#[from] RegistryError),

    #[error("source {0} registered more than once")]
    DuplicateSource(SourceId),

    #[error("engine configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid engine configuration:\n{}", format_validation_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("engine configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    #[error("cannot watch configuration files: {0}")]
    Watch(#[from] notify::Error),
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    for (field, errors) in errors.field_errors() {
        let _ = writeln!(output, "Field '{}':", field);
        for error in errors {
            let _ = writeln!(
                output,
                "  - {}",
                hostplane_config::describe_validation_error(error)
            );
        }
    }
    output
}

impl From<ValidationErrors> for EngineError {
    fn from(errors: ValidationErrors) -> Self {
        EngineError::Validation(errors)
    }
}

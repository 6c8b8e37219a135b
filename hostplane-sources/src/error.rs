//! Error types for source collection.

use std::path::PathBuf;
use thiserror::Error;

/// A source could not produce its mapping for this pass.
///
/// Never fatal: the engine records the failure and treats the source as
/// having supplied nothing.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{path}:{line}: expected 'key = value'")]
    Syntax { path: PathBuf, line: usize },

    #[error("configuration parsing error: {0}")]
    Parsing(#[from] figment::Error),

    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("datastore unreachable: {0}")]
    Unreachable(String),

    #[error("malformed configuration object: {0}")]
    Malformed(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

//! Error types for registry construction, coercion and validation

use thiserror::Error;
use validator::ValidationError;

use crate::kind::ValueKind;

/// Registry inconsistency. Always a programming error, fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("duplicate parameter name or alias '{name}' (normalised '{normalised}')")]
    DuplicateName { name: String, normalised: String },

    #[error("parameter '{field}': rule {rule} cannot apply to kind {kind}")]
    RuleKindMismatch {
        field: &'static str,
        rule: &'static str,
        kind: ValueKind,
    },

    #[error("parameter '{field}': enum kind declares no literals")]
    EmptyEnum { field: &'static str },

    #[error("parameter '{field}': malformed default '{default}': {reason}")]
    MalformedDefault {
        field: &'static str,
        default: &'static str,
        reason: String,
    },
}

/// A raw string could not be parsed as the declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("'{0}' is not a boolean (expected true/false/yes/no/1/0)")]
    Bool(String),

    #[error("'{0}' is not an integer")]
    Int(String),

    #[error("'{0}' is not a 32-bit mark")]
    Mark(String),

    #[error("'{0}' is not a duration: {1}")]
    Duration(String, String),

    #[error("'{value}' is not one of [{}]", .allowed.join(", "))]
    Enum {
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("'{0}' is not a valid port or port range")]
    PortRange(String),

    #[error("'{0}' is not a valid CIDR")]
    Cidr(String),

    #[error("'{0}' is not a key=value pair")]
    KeyValue(String),

    #[error("'{0}' is not a protocol:port[:cidr] entry")]
    ProtoPort(String),

    #[error("'{0}' is not a min,max route table range")]
    RouteTableRange(String),
}

/// Renders a validation error for diagnostics: the message when present,
/// otherwise the error code.
pub fn describe_validation_error(error: &ValidationError) -> String {
    match &error.message {
        Some(msg) => msg.to_string(),
        None => error.code.to_string(),
    }
}

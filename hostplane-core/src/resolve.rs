//! Per-field coercion and validation with default fallback.

use std::fmt;

use serde::Serialize;

use hostplane_config::{describe_validation_error, Registry, Value};
use hostplane_sources::SourceId;

use crate::merge::MergedRawMap;

/// How a parameter obtained its resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// No source supplied it.
    Default,
    Overridden,
    /// A source supplied it but the value was rejected.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    pub value: Value,
    pub outcome: Outcome,
    /// Source of the override that was considered, if any.
    pub source: Option<SourceId>,
}

impl ResolvedValue {
    pub fn default_value(value: Value) -> Self {
        Self {
            value,
            outcome: Outcome::Default,
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Coercion,
    Validation,
    UnknownKey,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::Coercion => "coercion",
            DiagnosticKind::Validation => "validation",
            DiagnosticKind::UnknownKey => "unknown-key",
        }
    }
}

/// One rejected override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Canonical name, or the key as spelled when it names no parameter.
    pub field: String,
    pub source: SourceId,
    pub raw: String,
    pub kind: DiagnosticKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: SourceId,
    pub error: String,
}

/// Everything that went wrong in one pass, reported as a single event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub diagnostics: Vec<Diagnostic>,
    pub source_failures: Vec<SourceFailure>,
    /// Prefixed environment variables that name no parameter.
    pub ignored_env_keys: usize,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.source_failures.is_empty()
    }

    pub fn diagnostics_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.field == field)
    }

    /// All problems on one line, separated by `; `. Used for log events.
    pub fn summary(&self) -> String {
        self.entries().collect::<Vec<_>>().join("; ")
    }

    fn entries(&self) -> impl Iterator<Item = String> + '_ {
        let failures = self
            .source_failures
            .iter()
            .map(|failure| format!("source {}: {}", failure.source, failure.error));
        let diagnostics = self.diagnostics.iter().map(|d| {
            format!(
                "{} (from {}) = {:?}: {} error: {}",
                d.field,
                d.source,
                d.raw,
                d.kind.as_str(),
                d.reason
            )
        });
        failures.chain(diagnostics)
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// Resolves every registered parameter from the merged overrides.
///
/// Never fails: a value that does not coerce or validate is replaced by the
/// parameter's default and recorded as a diagnostic.
pub fn resolve_all(registry: &Registry, merged: &MergedRawMap) -> (Vec<ResolvedValue>, PassReport) {
    let mut report = PassReport::default();
    let mut values = Vec::with_capacity(registry.len());

    for (index, descriptor) in registry.all_descriptors().iter().enumerate() {
        let default = registry.default_value(index);
        let Some(entry) = merged.get(index) else {
            values.push(ResolvedValue::default_value(default.clone()));
            continue;
        };

        let rejected = match descriptor.coerce(&entry.raw) {
            Err(e) => Some((DiagnosticKind::Coercion, e.to_string())),
            Ok(value) => match descriptor.validate(&value) {
                Err(e) => Some((DiagnosticKind::Validation, describe_validation_error(&e))),
                Ok(()) => {
                    values.push(ResolvedValue {
                        value,
                        outcome: Outcome::Overridden,
                        source: Some(entry.source),
                    });
                    None
                }
            },
        };

        if let Some((kind, reason)) = rejected {
            report.diagnostics.push(Diagnostic {
                field: descriptor.name.to_string(),
                source: entry.source,
                raw: entry.raw.clone(),
                kind,
                reason,
            });
            values.push(ResolvedValue {
                value: default.clone(),
                outcome: Outcome::Fallback,
                source: Some(entry.source),
            });
        }
    }

    for unknown in merged.unknown_keys() {
        // The environment carries unrelated prefixed variables too.
        if unknown.source == SourceId::Environment {
            tracing::debug!(key = %unknown.key, "Ignoring unknown environment parameter");
            report.ignored_env_keys += 1;
            continue;
        }
        report.diagnostics.push(Diagnostic {
            field: unknown.key.clone(),
            source: unknown.source,
            raw: unknown.raw.clone(),
            kind: DiagnosticKind::UnknownKey,
            reason: "no such parameter".into(),
        });
    }

    (values, report)
}

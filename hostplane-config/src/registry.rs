//! Parameter registry: the static table of field descriptors.
//!
//! Built once at startup. Any inconsistency in the table (duplicate names,
//! rules that cannot apply to a kind, defaults that do not parse) is a
//! [`RegistryError`] and must abort startup.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use validator::ValidationError;

use crate::coerce::coerce;
use crate::error::{describe_validation_error, CoercionError, RegistryError};
use crate::kind::ValueKind;
use crate::params;
use crate::validation::Rule;
use crate::value::Value;

lazy_static! {
    static ref BUILTIN: Result<Arc<Registry>, RegistryError> =
        Registry::new(params::all()).map(Arc::new);
}

/// Static metadata for one configurable parameter.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Canonical (datastore) name.
    pub name: &'static str,
    /// Legacy names accepted from any source.
    pub aliases: &'static [&'static str],
    pub kind: ValueKind,
    /// Default in wire form; coerced and validated when the registry is built.
    pub default: &'static str,
    pub rule: Rule,
    /// Whether a change can be adopted without restarting the agent.
    pub live: bool,
    pub doc: &'static str,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, kind: ValueKind, default: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            kind,
            default,
            rule: Rule::Any,
            live: false,
            doc: "",
        }
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    pub fn live(mut self) -> Self {
        self.live = true;
        self
    }

    pub fn doc(mut self, doc: &'static str) -> Self {
        self.doc = doc;
        self
    }

    pub fn requires_restart(&self) -> bool {
        !self.live
    }

    pub fn coerce(&self, raw: &str) -> Result<Value, CoercionError> {
        coerce(self.kind, raw)
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.rule.validate(value)
    }
}

/// Result of resolving a source key against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch {
    pub index: usize,
    /// The key spelled a legacy alias rather than the canonical name.
    pub via_alias: bool,
}

/// Lookup key: ASCII lowercase with `_` and `-` removed, so that
/// `IPTABLES_LOCK_TIMEOUT`, `IptablesLockTimeout` and `iptablesLockTimeout`
/// all name the same parameter.
pub fn normalise(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Immutable table of every known parameter.
#[derive(Debug)]
pub struct Registry {
    descriptors: Vec<FieldDescriptor>,
    defaults: Vec<Value>,
    names: HashMap<String, NameMatch>,
}

impl Registry {
    /// Builds a registry, checking every descriptor.
    pub fn new(descriptors: Vec<FieldDescriptor>) -> Result<Self, RegistryError> {
        let mut names = HashMap::with_capacity(descriptors.len() * 2);
        let mut defaults = Vec::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.iter().enumerate() {
            if let ValueKind::Enum(literals) = descriptor.kind {
                if literals.is_empty() {
                    return Err(RegistryError::EmptyEnum {
                        field: descriptor.name,
                    });
                }
            }
            if !descriptor.rule.applies_to(descriptor.kind) {
                return Err(RegistryError::RuleKindMismatch {
                    field: descriptor.name,
                    rule: descriptor.rule.name(),
                    kind: descriptor.kind,
                });
            }

            let spellings = std::iter::once((descriptor.name, false))
                .chain(descriptor.aliases.iter().map(|alias| (*alias, true)));
            for (spelling, via_alias) in spellings {
                let normalised = normalise(spelling);
                if names.contains_key(&normalised) {
                    return Err(RegistryError::DuplicateName {
                        name: spelling.to_string(),
                        normalised,
                    });
                }
                names.insert(normalised, NameMatch { index, via_alias });
            }

            let malformed = |reason: String| RegistryError::MalformedDefault {
                field: descriptor.name,
                default: descriptor.default,
                reason,
            };
            let default = descriptor
                .coerce(descriptor.default)
                .map_err(|e| malformed(e.to_string()))?;
            descriptor
                .validate(&default)
                .map_err(|e| malformed(describe_validation_error(&e)))?;
            defaults.push(default);
        }

        Ok(Self {
            descriptors,
            defaults,
            names,
        })
    }

    /// The built-in parameter table, constructed on first use.
    pub fn builtin() -> Result<Arc<Registry>, RegistryError> {
        BUILTIN.clone()
    }

    /// Resolves any accepted spelling of a parameter name.
    pub fn lookup(&self, key: &str) -> Option<NameMatch> {
        self.names.get(&normalise(key)).copied()
    }

    pub fn descriptor_for(&self, name: &str) -> Option<&FieldDescriptor> {
        self.lookup(name).map(|m| &self.descriptors[m.index])
    }

    pub fn canonical_name_for(&self, alias: &str) -> Option<&'static str> {
        self.descriptor_for(alias).map(|d| d.name)
    }

    /// Every descriptor, in declaration order.
    pub fn all_descriptors(&self) -> &[FieldDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, index: usize) -> &FieldDescriptor {
        &self.descriptors[index]
    }

    /// The coerced default of the parameter at `index`.
    pub fn default_value(&self, index: usize) -> &Value {
        &self.defaults[index]
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::TimeScale;
    use std::time::Duration;

    #[test]
    fn builtin_registry_is_consistent() {
        let registry = Registry::builtin().expect("built-in table must be consistent");
        assert!(registry.len() > 150);
    }

    #[test]
    fn names_are_resolved_in_any_spelling() {
        let registry = Registry::builtin().unwrap();
        for spelling in [
            "iptablesLockTimeout",
            "IptablesLockTimeout",
            "IPTABLES_LOCK_TIMEOUT",
            "IptablesLockTimeoutSecs",
        ] {
            assert_eq!(
                registry.canonical_name_for(spelling),
                Some("iptablesLockTimeout"),
                "{spelling}"
            );
        }
        assert!(registry.lookup("IptablesLockTimeoutSecs").unwrap().via_alias);
        assert!(!registry.lookup("IPTABLES_LOCK_TIMEOUT").unwrap().via_alias);
        assert_eq!(registry.canonical_name_for("noSuchThing"), None);
    }

    #[test]
    fn defaults_are_typed() {
        let registry = Registry::builtin().unwrap();
        let index = registry.lookup("iptablesLockProbeInterval").unwrap().index;
        assert_eq!(
            registry.default_value(index),
            &Value::Duration(Duration::from_millis(50))
        );
        let failsafe = registry.lookup("failsafeInboundHostPorts").unwrap().index;
        assert!(matches!(
            registry.default_value(failsafe),
            Value::ProtoPorts(ports) if ports.len() == 8
        ));
    }

    #[test]
    fn declaration_order_is_kept() {
        let registry = Registry::new(vec![
            FieldDescriptor::new("b", ValueKind::Bool, "true"),
            FieldDescriptor::new("a", ValueKind::Int, "1"),
        ])
        .unwrap();
        let names: Vec<_> = registry.all_descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn malformed_default_is_fatal() {
        let err = Registry::new(vec![FieldDescriptor::new(
            "refresh",
            ValueKind::Duration(TimeScale::Seconds),
            "often",
        )])
        .unwrap_err();
        assert!(matches!(err, RegistryError::MalformedDefault { field: "refresh", .. }));
    }

    #[test]
    fn default_failing_its_rule_is_fatal() {
        let err = Registry::new(vec![FieldDescriptor::new("priority", ValueKind::Int, "0")
            .rule(Rule::Range { min: 1, max: 32765 })])
        .unwrap_err();
        assert!(matches!(err, RegistryError::MalformedDefault { .. }));
    }

    #[test]
    fn rule_must_fit_kind() {
        let err = Registry::new(vec![
            FieldDescriptor::new("pattern", ValueKind::Bool, "true").rule(Rule::Regex)
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::RuleKindMismatch { .. }));
    }

    #[test]
    fn alias_collisions_are_fatal() {
        let err = Registry::new(vec![
            FieldDescriptor::new("reportingInterval", ValueKind::Int, "1"),
            FieldDescriptor::new("other", ValueKind::Int, "1").aliases(&["REPORTING_INTERVAL"]),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));
    }

    #[test]
    fn empty_enum_is_fatal() {
        let err = Registry::new(vec![FieldDescriptor::new("mode", ValueKind::Enum(&[]), "")])
            .unwrap_err();
        assert!(matches!(err, RegistryError::EmptyEnum { field: "mode" }));
    }
}

//! Immutable configuration snapshots and change detection.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use hostplane_config::{FieldDescriptor, PortRange, ProtoPort, Registry, RouteTableRange, Value};

use crate::resolve::{Outcome, ResolvedValue};

/// What the first committed pass reports as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstPassPolicy {
    /// Every field whose resolved value differs from its built-in default.
    DiffAgainstDefaults,
    /// Nothing.
    Suppress,
}

/// One field whose value differs between consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub field: &'static str,
    pub old: Value,
    pub new: Value,
    pub requires_restart: bool,
}

/// A fully resolved configuration. Never mutated once built.
#[derive(Debug, Clone)]
pub struct Snapshot {
    registry: Arc<Registry>,
    generation: u64,
    values: Vec<ResolvedValue>,
    committed_at: DateTime<Utc>,
}

impl Snapshot {
    /// Generation 0: every parameter at its default. Stands in for "no
    /// snapshot yet" so that readers never have to wait for the first pass.
    pub fn defaults(registry: Arc<Registry>) -> Self {
        let values = (0..registry.len())
            .map(|index| ResolvedValue::default_value(registry.default_value(index).clone()))
            .collect();
        Self {
            registry,
            generation: 0,
            values,
            committed_at: Utc::now(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Looks a parameter up by any accepted spelling.
    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.registry
            .lookup(name)
            .and_then(|m| self.values.get(m.index))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).map(|resolved| &resolved.value)
    }

    /// Descriptors and values in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, &ResolvedValue)> {
        self.registry.all_descriptors().iter().zip(&self.values)
    }

    /// Fields some source overrode successfully.
    pub fn overridden(&self) -> impl Iterator<Item = (&FieldDescriptor, &ResolvedValue)> {
        self.iter()
            .filter(|(_, resolved)| resolved.outcome == Outcome::Overridden)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(Value::as_bool)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_int)
    }

    pub fn duration(&self, name: &str) -> Option<Duration> {
        self.value(name).and_then(Value::as_duration)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.value(name).and_then(Value::as_list)
    }

    pub fn proto_ports(&self, name: &str) -> Option<&[ProtoPort]> {
        match self.value(name)? {
            Value::ProtoPorts(ports) => Some(ports),
            _ => None,
        }
    }

    pub fn cidrs(&self, name: &str) -> Option<&[IpNetwork]> {
        match self.value(name)? {
            Value::Cidrs(nets) => Some(nets),
            _ => None,
        }
    }

    pub fn key_values(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match self.value(name)? {
            Value::KeyValues(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn port_range(&self, name: &str) -> Option<PortRange> {
        match self.value(name)? {
            Value::PortRange(range) => Some(*range),
            _ => None,
        }
    }

    pub fn port_ranges(&self, name: &str) -> Option<&[PortRange]> {
        match self.value(name)? {
            Value::PortRanges(ranges) => Some(ranges),
            _ => None,
        }
    }

    pub fn route_table_range(&self, name: &str) -> Option<RouteTableRange> {
        match self.value(name)? {
            Value::RouteTableRange(range) => Some(*range),
            _ => None,
        }
    }

    /// Fields whose value differs from `older`, in registry order.
    pub fn changes_since(&self, older: &Snapshot) -> Vec<ChangeRecord> {
        diff(
            &self.registry,
            older.values.iter().map(|r| &r.value),
            &self.values,
        )
    }

    /// Canonical name to wire form, for writing the configuration back out.
    pub fn to_wire_map(&self) -> BTreeMap<&'static str, String> {
        self.iter()
            .map(|(descriptor, resolved)| (descriptor.name, resolved.value.to_string()))
            .collect()
    }

    /// Hex BLAKE3 digest of the wire map. Equal values give equal digests
    /// whatever the generation.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (descriptor, resolved) in self.iter() {
            hasher.update(descriptor.name.as_bytes());
            hasher.update(b"=");
            hasher.update(resolved.value.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields: BTreeMap<&str, &ResolvedValue> = self
            .iter()
            .map(|(descriptor, resolved)| (descriptor.name, resolved))
            .collect();
        let mut state = serializer.serialize_struct("Snapshot", 4)?;
        state.serialize_field("generation", &self.generation)?;
        state.serialize_field("committed_at", &self.committed_at)?;
        state.serialize_field("fingerprint", &self.fingerprint())?;
        state.serialize_field("fields", &fields)?;
        state.end()
    }
}

/// Builds the next snapshot and the changes it makes.
///
/// With no previous snapshot the policy decides what counts as changed.
pub fn build(
    registry: Arc<Registry>,
    values: Vec<ResolvedValue>,
    previous: Option<&Snapshot>,
    policy: FirstPassPolicy,
) -> (Snapshot, Vec<ChangeRecord>) {
    let generation = previous.map_or(1, |p| p.generation + 1);

    let changes = match (previous, policy) {
        (Some(previous), _) => diff(&registry, previous.values.iter().map(|r| &r.value), &values),
        (None, FirstPassPolicy::DiffAgainstDefaults) => diff(
            &registry,
            (0..registry.len()).map(|index| registry.default_value(index)),
            &values,
        ),
        (None, FirstPassPolicy::Suppress) => Vec::new(),
    };

    let snapshot = Snapshot {
        registry,
        generation,
        values,
        committed_at: Utc::now(),
    };
    (snapshot, changes)
}

fn diff<'a>(
    registry: &Registry,
    old: impl Iterator<Item = &'a Value>,
    new: &[ResolvedValue],
) -> Vec<ChangeRecord> {
    registry
        .all_descriptors()
        .iter()
        .zip(old)
        .zip(new)
        .filter(|((_, old), new)| **old != new.value)
        .map(|((descriptor, old), new)| ChangeRecord {
            field: descriptor.name,
            old: old.clone(),
            new: new.value.clone(),
            requires_restart: descriptor.requires_restart(),
        })
        .collect()
}

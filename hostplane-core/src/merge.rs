//! Precedence merge of raw source mappings.
//!
//! Names are resolved to registry indices before precedence is compared, so
//! a legacy alias in a higher-ranked source beats the canonical name in a
//! lower-ranked one.

use serde::Serialize;

use hostplane_config::Registry;
use hostplane_sources::{RawMap, SourceId};

/// The winning raw override for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedEntry {
    pub raw: String,
    pub source: SourceId,
    /// Key as spelled by the winning source.
    pub key: String,
}

/// A key that names no registered parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownKey {
    pub source: SourceId,
    pub key: String,
    pub raw: String,
}

/// Winning raw value per parameter, indexed like the registry.
#[derive(Debug, Clone, Default)]
pub struct MergedRawMap {
    entries: Vec<Option<MergedEntry>>,
    unknown: Vec<UnknownKey>,
}

impl MergedRawMap {
    pub fn get(&self, index: usize) -> Option<&MergedEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    pub fn get_by_name(&self, registry: &Registry, name: &str) -> Option<&MergedEntry> {
        registry.lookup(name).and_then(|m| self.get(m.index))
    }

    /// Supplied entries with their registry index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &MergedEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|e| (index, e)))
    }

    pub fn supplied(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn unknown_keys(&self) -> &[UnknownKey] {
        &self.unknown
    }
}

/// Merges source mappings by fixed rank; caller order is irrelevant.
///
/// The first source in precedence order that supplies a parameter under any
/// accepted spelling wins. Lower-ranked values for the same parameter are
/// dropped silently. Blank values count as not supplied. Within one source a
/// canonical spelling beats an alias.
pub fn merge(
    registry: &Registry,
    sources: impl IntoIterator<Item = (SourceId, RawMap)>,
) -> MergedRawMap {
    let mut sources: Vec<(SourceId, RawMap)> = sources.into_iter().collect();
    sources.sort_by_key(|(id, _)| id.rank());

    let mut merged = MergedRawMap {
        entries: vec![None; registry.len()],
        unknown: Vec::new(),
    };

    for (source, values) in sources {
        let mut from_source: Vec<Option<(MergedEntry, bool)>> = vec![None; registry.len()];
        for (key, raw) in values {
            if raw.trim().is_empty() {
                continue;
            }
            let Some(found) = registry.lookup(&key) else {
                merged.unknown.push(UnknownKey { source, key, raw });
                continue;
            };
            let slot = &mut from_source[found.index];
            let replace = match slot {
                None => true,
                Some((_, held_via_alias)) => *held_via_alias && !found.via_alias,
            };
            if replace {
                *slot = Some((MergedEntry { raw, source, key }, found.via_alias));
            }
        }

        for (winner, candidate) in merged.entries.iter_mut().zip(from_source) {
            if winner.is_none() {
                *winner = candidate.map(|(entry, _)| entry);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn higher_rank_wins_regardless_of_spelling() {
        let registry = Registry::builtin().unwrap();
        for (high, low) in [
            ("IptablesLockTimeoutSecs", "iptablesLockTimeout"),
            ("iptablesLockTimeout", "IptablesLockTimeoutSecs"),
            ("IPTABLES_LOCK_TIMEOUT", "iptablesLockTimeout"),
        ] {
            let merged = merge(
                &registry,
                [
                    (SourceId::DatastoreGlobal, raw(&[(low, "30")])),
                    (SourceId::Environment, raw(&[(high, "5")])),
                ],
            );
            let entry = merged.get_by_name(&registry, "iptablesLockTimeout").unwrap();
            assert_eq!(entry.raw, "5", "{high} over {low}");
            assert_eq!(entry.source, SourceId::Environment);
            assert_eq!(entry.key, high);
        }
    }

    #[test]
    fn canonical_spelling_wins_within_a_source() {
        let registry = Registry::builtin().unwrap();
        let merged = merge(
            &registry,
            [(
                SourceId::LocalFile,
                raw(&[("ReportingIntervalSecs", "60"), ("reportingInterval", "15")]),
            )],
        );
        let entry = merged.get_by_name(&registry, "reportingInterval").unwrap();
        assert_eq!(entry.raw, "15");
    }

    #[test]
    fn blank_values_fall_through() {
        let registry = Registry::builtin().unwrap();
        let merged = merge(
            &registry,
            [
                (SourceId::Environment, raw(&[("LOGSEVERITYSCREEN", "  ")])),
                (SourceId::DatastorePerHost, raw(&[("logSeverityScreen", "Debug")])),
            ],
        );
        let entry = merged.get_by_name(&registry, "logSeverityScreen").unwrap();
        assert_eq!(entry.source, SourceId::DatastorePerHost);
        assert_eq!(merged.supplied(), 1);
    }

    #[test]
    fn unknown_keys_are_collected() {
        let registry = Registry::builtin().unwrap();
        let merged = merge(
            &registry,
            [(SourceId::LocalFile, raw(&[("noSuchKnob", "1"), ("bpfEnabled", "true")]))],
        );
        assert_eq!(merged.supplied(), 1);
        assert_eq!(
            merged.unknown_keys(),
            [UnknownKey {
                source: SourceId::LocalFile,
                key: "noSuchKnob".into(),
                raw: "1".into(),
            }]
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn spelling() -> impl Strategy<Value = &'static str> {
            prop_oneof![
                Just("iptablesLockTimeout"),
                Just("IptablesLockTimeout"),
                Just("IPTABLES_LOCK_TIMEOUT"),
                Just("IptablesLockTimeoutSecs"),
            ]
        }

        fn ranked_pair() -> impl Strategy<Value = (SourceId, SourceId)> {
            (0usize..4, 0usize..4)
                .prop_filter("distinct sources", |(a, b)| a != b)
                .prop_map(|(a, b)| (SourceId::ALL[a.min(b)], SourceId::ALL[a.max(b)]))
        }

        proptest! {
            #[test]
            fn higher_ranked_source_always_wins(
                (high, low) in ranked_pair(),
                high_key in spelling(),
                low_key in spelling(),
                high_value in 0u32..1000,
                low_value in 0u32..1000,
                swap_order in any::<bool>(),
            ) {
                let registry = Registry::builtin().unwrap();
                let mut sources = vec![
                    (high, raw(&[(high_key, high_value.to_string().as_str())])),
                    (low, raw(&[(low_key, low_value.to_string().as_str())])),
                ];
                if swap_order {
                    sources.reverse();
                }
                let merged = merge(&registry, sources);
                let entry = merged.get_by_name(&registry, "iptablesLockTimeout").unwrap();
                prop_assert_eq!(entry.source, high);
                prop_assert_eq!(&entry.raw, &high_value.to_string());
            }
        }
    }
}

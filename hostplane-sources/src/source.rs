//! The uniform raw-source contract.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::SourceError;

/// Untyped overrides as supplied by one source: key spelling as found, raw value.
pub type RawMap = BTreeMap<String, String>;

/// Identity of an override source. Declaration order is precedence order,
/// highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceId {
    Environment,
    LocalFile,
    DatastorePerHost,
    DatastoreGlobal,
}

impl SourceId {
    /// Every source, highest precedence first.
    pub const ALL: [SourceId; 4] = [
        SourceId::Environment,
        SourceId::LocalFile,
        SourceId::DatastorePerHost,
        SourceId::DatastoreGlobal,
    ];

    /// 0 is the highest precedence.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Environment => "environment",
            SourceId::LocalFile => "local-file",
            SourceId::DatastorePerHost => "datastore-per-host",
            SourceId::DatastoreGlobal => "datastore-global",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked origin of raw configuration overrides.
#[async_trait]
pub trait RawSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Reads the current overrides.
    ///
    /// Keys are returned as spelled by the source; name resolution happens in
    /// the merger.
    async fn collect(&self) -> Result<RawMap, SourceError>;
}

/// An in-memory source.
#[derive(Debug, Clone)]
pub struct StaticSource {
    id: SourceId,
    values: RawMap,
}

impl StaticSource {
    pub fn new(id: SourceId, values: RawMap) -> Self {
        Self { id, values }
    }

    pub fn from_pairs<K, V>(id: SourceId, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            id,
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[async_trait]
impl RawSource for StaticSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn collect(&self) -> Result<RawMap, SourceError> {
        Ok(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_follow_precedence() {
        let ranks: Vec<u8> = SourceId::ALL.iter().map(|id| id.rank()).collect();
        assert_eq!(ranks, [0, 1, 2, 3]);
        assert!(SourceId::Environment < SourceId::DatastoreGlobal);
    }

    #[tokio::test]
    async fn static_source_returns_its_pairs() {
        let source =
            StaticSource::from_pairs(SourceId::LocalFile, [("LogSeverityScreen", "Debug")]);
        let values = source.collect().await.unwrap();
        assert_eq!(values.get("LogSeverityScreen").map(String::as_str), Some("Debug"));
        assert_eq!(source.id(), SourceId::LocalFile);
    }
}

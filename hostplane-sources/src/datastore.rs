//! Datastore-backed sources.
//!
//! The datastore client is an external collaborator: it watches the
//! per-host and global configuration objects and pushes what it sees into a
//! [`DatastoreHandle`]. The matching [`DatastoreSource`] hands the latest
//! contents to each resolution pass.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::flatten::flatten_object;
use crate::{RawMap, RawSource, SourceError, SourceId};

#[derive(Debug, Clone)]
enum DatastoreState {
    Synced(RawMap),
    Unreachable(String),
}

/// Write side of a datastore source. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct DatastoreHandle {
    state: Arc<RwLock<DatastoreState>>,
}

impl DatastoreHandle {
    /// A handle with no object received yet, i.e. no overrides.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(DatastoreState::Synced(RawMap::new()))),
        }
    }

    /// Replaces the object contents with already-flattened raw values.
    pub fn publish(&self, values: RawMap) {
        debug!(count = values.len(), "Datastore object updated");
        *self.state.write() = DatastoreState::Synced(values);
    }

    /// Replaces the object contents from a JSON document, either a whole
    /// `FelixConfiguration` or its bare spec.
    pub fn publish_spec_json(&self, json: &str) -> Result<(), SourceError> {
        let object: serde_json::Value = serde_json::from_str(json)?;
        self.publish(flatten_object(&object)?);
        Ok(())
    }

    /// The object was deleted: no overrides.
    pub fn clear(&self) {
        self.publish(RawMap::new());
    }

    /// Subsequent collections fail until the next publish.
    pub fn mark_unreachable(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "Datastore marked unreachable");
        *self.state.write() = DatastoreState::Unreachable(reason);
    }
}

impl Default for DatastoreHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// One datastore configuration object, per-host or global.
#[derive(Debug, Clone)]
pub struct DatastoreSource {
    id: SourceId,
    handle: DatastoreHandle,
}

impl DatastoreSource {
    /// The object named after this host.
    pub fn per_host(handle: DatastoreHandle) -> Self {
        Self {
            id: SourceId::DatastorePerHost,
            handle,
        }
    }

    /// The cluster-wide `default` object.
    pub fn global(handle: DatastoreHandle) -> Self {
        Self {
            id: SourceId::DatastoreGlobal,
            handle,
        }
    }

    pub fn handle(&self) -> &DatastoreHandle {
        &self.handle
    }
}

#[async_trait]
impl RawSource for DatastoreSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn collect(&self) -> Result<RawMap, SourceError> {
        match &*self.handle.state.read() {
            DatastoreState::Synced(values) => Ok(values.clone()),
            DatastoreState::Unreachable(reason) => Err(SourceError::Unreachable(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_latest_publication() {
        let handle = DatastoreHandle::new();
        let source = DatastoreSource::per_host(handle.clone());
        assert!(source.collect().await.unwrap().is_empty());

        handle
            .publish_spec_json(r#"{"spec": {"logSeverityScreen": "Debug"}}"#)
            .unwrap();
        let values = source.collect().await.unwrap();
        assert_eq!(values["logSeverityScreen"], "Debug");

        handle.clear();
        assert!(source.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_until_next_publish() {
        let handle = DatastoreHandle::new();
        let source = DatastoreSource::global(handle.clone());
        handle.mark_unreachable("connection refused");
        assert!(matches!(
            source.collect().await,
            Err(SourceError::Unreachable(reason)) if reason == "connection refused"
        ));

        handle.publish(RawMap::from([("bpfEnabled".to_string(), "true".to_string())]));
        assert_eq!(source.collect().await.unwrap()["bpfEnabled"], "true");
    }

    #[test]
    fn malformed_json_leaves_state_untouched() {
        let handle = DatastoreHandle::new();
        handle.publish(RawMap::from([("bpfEnabled".to_string(), "true".to_string())]));
        assert!(handle.publish_spec_json("{not json").is_err());
        assert!(matches!(
            &*handle.state.read(),
            DatastoreState::Synced(values) if values.len() == 1
        ));
    }
}

//! Subscriber side of committed updates.
//!
//! The broadcast channel is bounded, so a slow subscriber can miss updates.
//! [`Subscription`] remembers the last snapshot it handed out and, after a
//! gap, diffs the next snapshot against it. Change records therefore always
//! chain: every `old` is the `new` of the previous delivery.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::engine::ConfigUpdate;
use crate::snapshot::Snapshot;

pub struct Subscription {
    receiver: broadcast::Receiver<Arc<ConfigUpdate>>,
    last_seen: Arc<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Arc<ConfigUpdate>>,
        last_seen: Arc<Snapshot>,
    ) -> Self {
        Self {
            receiver,
            last_seen,
        }
    }

    /// The snapshot the next update's changes are computed against.
    pub fn last_seen(&self) -> &Arc<Snapshot> {
        &self.last_seen
    }

    /// Waits for the next committed update. `None` once the engine is gone.
    ///
    /// Updates older than the last one delivered are skipped. When updates
    /// were missed the returned changes cover everything since the last
    /// delivery.
    pub async fn recv(&mut self) -> Option<Arc<ConfigUpdate>> {
        loop {
            match self.receiver.recv().await {
                Ok(update) => {
                    let generation = update.snapshot.generation();
                    let last = self.last_seen.generation();
                    if generation <= last {
                        continue;
                    }
                    let update = if generation == last + 1 {
                        update
                    } else {
                        Arc::new(ConfigUpdate {
                            snapshot: update.snapshot.clone(),
                            changes: update.snapshot.changes_since(&self.last_seen),
                            report: update.report.clone(),
                        })
                    };
                    self.last_seen = update.snapshot.clone();
                    return Some(update);
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "Subscriber fell behind; next update covers the gap");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

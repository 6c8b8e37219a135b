//! Drives resolution passes: once at startup, then on every poll tick or
//! explicit trigger until shut down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::{ConfigEngine, PassOutcome};

/// Requests a pass, e.g. from a file or datastore watch.
///
/// Triggers fired while a pass is running collapse into a single follow-up
/// pass.
#[derive(Debug, Clone)]
pub struct Trigger {
    notify: Arc<Notify>,
}

impl Trigger {
    pub fn fire(&self) {
        self.notify.notify_one();
    }
}

/// Control side of a running [`Driver`].
#[derive(Debug, Clone)]
pub struct DriverHandle {
    trigger: Trigger,
    shutdown: Arc<watch::Sender<bool>>,
}

impl DriverHandle {
    pub fn trigger(&self) -> Trigger {
        self.trigger.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wakeup {
    Startup,
    Poll,
    Trigger,
}

pub struct Driver {
    engine: Arc<ConfigEngine>,
    poll_interval: Option<Duration>,
    notify: Arc<Notify>,
    shutdown: watch::Receiver<bool>,
}

impl Driver {
    /// A zero `poll_interval` disables polling; passes then only run on
    /// triggers.
    pub fn new(engine: Arc<ConfigEngine>, poll_interval: Duration) -> (Self, DriverHandle) {
        let notify = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = Self {
            engine,
            poll_interval: (!poll_interval.is_zero()).then_some(poll_interval),
            notify: notify.clone(),
            shutdown: shutdown_rx,
        };
        let handle = DriverHandle {
            trigger: Trigger { notify },
            shutdown: Arc::new(shutdown_tx),
        };
        (driver, handle)
    }

    pub async fn run(mut self) {
        let mut ticker = self.poll_interval.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.reset();
            ticker
        });

        let mut wakeup = Wakeup::Startup;
        loop {
            debug!(?wakeup, "Starting resolution pass");
            if let PassOutcome::Committed(update) = self.engine.resolve().await {
                if update.requires_restart() {
                    info!(
                        generation = update.snapshot.generation(),
                        "Committed changes require an agent restart to take effect"
                    );
                }
            }

            match self.wait(&mut ticker).await {
                Some(next) => wakeup = next,
                None => break,
            }
        }
        info!("Configuration driver stopped");
    }

    /// Waits for the next reason to run a pass; `None` on shutdown or when
    /// every [`DriverHandle`] is gone.
    async fn wait(&mut self, ticker: &mut Option<Interval>) -> Option<Wakeup> {
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        return None;
                    }
                }
                _ = self.notify.notified() => return Some(Wakeup::Trigger),
                _ = next_tick(ticker) => return Some(Wakeup::Poll),
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use hostplane_config::Registry;
    use hostplane_sources::{DatastoreHandle, DatastoreSource, RawSource};

    fn engine(handle: DatastoreHandle) -> Arc<ConfigEngine> {
        let sources: Vec<Arc<dyn RawSource>> = vec![Arc::new(DatastoreSource::global(handle))];
        Arc::new(
            ConfigEngine::new(Registry::builtin().unwrap(), sources, EngineOptions::default())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn trigger_runs_a_pass() {
        let datastore = DatastoreHandle::new();
        let engine = engine(datastore.clone());
        let mut updates = engine.subscribe();
        let (driver, handle) = Driver::new(engine.clone(), Duration::ZERO);
        let task = tokio::spawn(driver.run());

        let startup = updates.recv().await.unwrap();
        assert_eq!(startup.snapshot.generation(), 1);

        datastore
            .publish_spec_json(r#"{"logSeverityScreen": "Debug"}"#)
            .unwrap();
        handle.trigger().fire();
        let update = updates.recv().await.unwrap();
        assert_eq!(update.snapshot.string("logSeverityScreen"), Some("Debug"));
        assert_eq!(update.changes.len(), 1);
        assert!(!update.requires_restart());

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn polls_periodically() {
        let engine = engine(DatastoreHandle::new());
        let mut updates = engine.subscribe();
        let (driver, handle) = Driver::new(engine.clone(), Duration::from_secs(10));
        let task = tokio::spawn(driver.run());

        for generation in 1..=3 {
            let update = updates.recv().await.unwrap();
            assert_eq!(update.snapshot.generation(), generation);
        }

        handle.shutdown();
        task.await.unwrap();
    }
}

//! The resolution engine.
//!
//! One pass: collect every source concurrently, merge by precedence, coerce
//! and validate each parameter, build a snapshot, publish it. Passes are
//! serialised by a FIFO lock. The current snapshot lives behind an
//! [`ArcSwap`], so readers never block and only ever see whole snapshots.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, instrument, warn};

use hostplane_config::Registry;
use hostplane_sources::{RawMap, RawSource, SourceId};
use hostplane_telemetry::ResolutionMetrics;

use crate::merge::merge;
use crate::resolve::{resolve_all, PassReport, SourceFailure};
use crate::snapshot::{build, ChangeRecord, FirstPassPolicy, Snapshot};
use crate::subscription::Subscription;
use crate::EngineError;

/// Delivered to subscribers after every committed pass.
#[derive(Debug)]
pub struct ConfigUpdate {
    pub snapshot: Arc<Snapshot>,
    pub changes: Vec<ChangeRecord>,
    pub report: PassReport,
}

impl ConfigUpdate {
    pub fn requires_restart(&self) -> bool {
        self.changes.iter().any(|c| c.requires_restart)
    }
}

#[derive(Debug)]
pub enum PassOutcome {
    Committed(Arc<ConfigUpdate>),
    /// A newer pass was requested while this one was collecting; its result
    /// was dropped in favour of the newer one.
    Superseded,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub channel_capacity: usize,
    pub first_pass: FirstPassPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            first_pass: FirstPassPolicy::DiffAgainstDefaults,
        }
    }
}

struct PassState {
    committed_any: bool,
}

pub struct ConfigEngine {
    registry: Arc<Registry>,
    sources: Vec<Arc<dyn RawSource>>,
    current: ArcSwap<Snapshot>,
    pass_lock: Mutex<PassState>,
    tickets: AtomicU64,
    updates: broadcast::Sender<Arc<ConfigUpdate>>,
    first_pass: FirstPassPolicy,
    metrics: Option<Arc<ResolutionMetrics>>,
}

impl ConfigEngine {
    pub fn new(
        registry: Arc<Registry>,
        sources: Vec<Arc<dyn RawSource>>,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.id()) {
                return Err(EngineError::DuplicateSource(source.id()));
            }
        }

        let (updates, _) = broadcast::channel(options.channel_capacity.max(1));
        Ok(Self {
            current: ArcSwap::from_pointee(Snapshot::defaults(registry.clone())),
            registry,
            sources,
            pass_lock: Mutex::new(PassState {
                committed_any: false,
            }),
            tickets: AtomicU64::new(0),
            updates,
            first_pass: options.first_pass,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<ResolutionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The latest committed snapshot. Generation 0 (all defaults) until the
    /// first pass commits.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Updates committed after this call, diffed against the snapshot that
    /// was current when it was made.
    pub fn subscribe(&self) -> Subscription {
        let receiver = self.updates.subscribe();
        Subscription::new(receiver, self.current.load_full())
    }

    /// Runs one resolution pass, queueing behind any pass in flight.
    #[instrument(skip(self), fields(ticket = tracing::field::Empty))]
    pub async fn resolve(&self) -> PassOutcome {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("ticket", ticket);

        let mut state = self.pass_lock.lock().await;
        let started = Instant::now();
        let collected = self.collect_all().await;

        if self.tickets.load(Ordering::SeqCst) > ticket {
            debug!("Newer pass queued; discarding collected sources");
            if let Some(metrics) = &self.metrics {
                metrics.inc_superseded();
            }
            return PassOutcome::Superseded;
        }

        let mut failures = Vec::new();
        let mut maps = Vec::with_capacity(collected.len());
        for (source, result) in collected {
            match result {
                Ok(values) => maps.push((source, values)),
                Err(error) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_source_failure(source.as_str());
                    }
                    failures.push(SourceFailure { source, error });
                }
            }
        }

        let merged = merge(&self.registry, maps);
        let (values, mut report) = resolve_all(&self.registry, &merged);
        report.source_failures = failures;

        let previous = self.current.load_full();
        let policy = self.first_pass;
        let (snapshot, changes) = if state.committed_any {
            build(self.registry.clone(), values, Some(&previous), policy)
        } else {
            build(self.registry.clone(), values, None, policy)
        };
        let snapshot = Arc::new(snapshot);
        self.current.store(snapshot.clone());
        state.committed_any = true;

        let generation = snapshot.generation();
        if let Some(metrics) = &self.metrics {
            metrics.observe_commit(generation, started.elapsed());
            for diagnostic in &report.diagnostics {
                metrics.inc_diagnostic(diagnostic.kind.as_str());
            }
        }
        if !report.is_clean() {
            warn!(
                generation,
                rejected = report.diagnostics.len(),
                failed_sources = report.source_failures.len(),
                report = %report.summary(),
                "Configuration problems, affected fields use defaults"
            );
        }
        for change in &changes {
            debug!(
                field = change.field,
                old = %change.old,
                new = %change.new,
                restart = change.requires_restart,
                "Parameter changed"
            );
        }
        info!(
            generation,
            supplied = merged.supplied(),
            changes = changes.len(),
            "Committed configuration snapshot"
        );

        let update = Arc::new(ConfigUpdate {
            snapshot,
            changes,
            report,
        });
        // No subscribers is fine.
        let _ = self.updates.send(update.clone());
        PassOutcome::Committed(update)
    }

    /// Collects every source concurrently and waits for all of them.
    async fn collect_all(&self) -> Vec<(SourceId, Result<RawMap, String>)> {
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = source.clone();
                (source.id(), tokio::spawn(async move { source.collect().await }))
            })
            .collect();

        let mut collected = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let result = match handle.await {
                Ok(Ok(values)) => Ok(values),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("collector task failed: {e}")),
            };
            if let Err(error) = &result {
                debug!(source = %id, %error, "Source contributed nothing this pass");
            }
            collected.push((id, result));
        }
        collected
    }
}

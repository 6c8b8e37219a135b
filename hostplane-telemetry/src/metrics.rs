//! Prometheus metrics for resolution passes.

use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Debug, Clone)]
pub struct ResolutionMetrics {
    pub registry: Registry,
    pub passes: IntCounter,
    pub superseded_passes: IntCounter,
    pub diagnostics: IntCounterVec,
    pub source_failures: IntCounterVec,
    pub committed_generation: IntGauge,
    pub pass_duration: Histogram,
}

impl ResolutionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let passes = IntCounter::new(
            "hostplane_resolution_passes_total",
            "Committed configuration resolution passes",
        )?;
        let superseded_passes = IntCounter::new(
            "hostplane_resolution_superseded_total",
            "Resolution passes discarded because a newer pass was requested while collecting",
        )?;
        let diagnostics = IntCounterVec::new(
            Opts::new(
                "hostplane_resolution_diagnostics_total",
                "Rejected overrides by reason",
            ),
            &["reason"],
        )?;
        let source_failures = IntCounterVec::new(
            Opts::new(
                "hostplane_source_failures_total",
                "Sources that failed to collect during a pass",
            ),
            &["source"],
        )?;
        let committed_generation = IntGauge::new(
            "hostplane_committed_generation",
            "Generation of the current configuration snapshot",
        )?;
        let pass_duration = Histogram::with_opts(
            HistogramOpts::new(
                "hostplane_resolution_pass_seconds",
                "Wall time of one resolution pass, source collection included",
            )
            .buckets(vec![0.000_1, 0.001, 0.01, 0.1, 1.0, 10.0]),
        )?;

        registry.register(Box::new(passes.clone()))?;
        registry.register(Box::new(superseded_passes.clone()))?;
        registry.register(Box::new(diagnostics.clone()))?;
        registry.register(Box::new(source_failures.clone()))?;
        registry.register(Box::new(committed_generation.clone()))?;
        registry.register(Box::new(pass_duration.clone()))?;

        Ok(Self {
            registry,
            passes,
            superseded_passes,
            diagnostics,
            source_failures,
            committed_generation,
            pass_duration,
        })
    }

    pub fn observe_commit(&self, generation: u64, elapsed: Duration) {
        self.passes.inc();
        self.committed_generation
            .set(i64::try_from(generation).unwrap_or(i64::MAX));
        self.pass_duration.observe(elapsed.as_secs_f64());
    }

    pub fn inc_superseded(&self) {
        self.superseded_passes.inc();
    }

    pub fn inc_diagnostic(&self, reason: &str) {
        self.diagnostics.with_label_values(&[reason]).inc();
    }

    pub fn inc_source_failure(&self, source: &str) {
        self.source_failures.with_label_values(&[source]).inc();
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

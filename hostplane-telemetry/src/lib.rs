//! # Hostplane Telemetry
//!
//! Logging setup and Prometheus metrics for configuration resolution.

pub mod logging;
pub mod metrics;

pub use logging::{filter_for_severity, init_logging, try_init_logging};
pub use metrics::ResolutionMetrics;

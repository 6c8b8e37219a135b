//! Structured logging with tracing.
//!
//! `RUST_LOG` always wins. Otherwise the caller's directive is used, which
//! the CLI derives from the resolved `logSeverityScreen`.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

const FALLBACK_DIRECTIVE: &str = "info";

fn env_filter(default_directive: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        default_directive
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new(FALLBACK_DIRECTIVE))
    })
}

/// Installs the global fmt subscriber. Panics if one is already installed.
pub fn init_logging(default_directive: Option<&str>) {
    fmt()
        .with_env_filter(env_filter(default_directive))
        .with_thread_names(true)
        .with_target(false)
        .init()
}

/// Like [`init_logging`], but reports instead of panicking when a subscriber
/// is already installed.
pub fn try_init_logging(default_directive: Option<&str>) -> bool {
    fmt()
        .with_env_filter(env_filter(default_directive))
        .with_thread_names(true)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Maps an agent log severity onto a tracing level.
///
/// `None` (logging disabled) maps to `None`. `Fatal` has no tracing
/// counterpart and maps to `ERROR`.
pub fn filter_for_severity(severity: &str) -> Option<Level> {
    match severity.to_ascii_lowercase().as_str() {
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warning" | "warn" => Some(Level::WARN),
        "error" | "fatal" | "panic" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn severities_map_to_levels() {
        assert_eq!(filter_for_severity("Debug"), Some(Level::DEBUG));
        assert_eq!(filter_for_severity("Warning"), Some(Level::WARN));
        assert_eq!(filter_for_severity("Fatal"), Some(Level::ERROR));
        assert_eq!(filter_for_severity("None"), None);
    }

    #[traced_test]
    #[test]
    fn second_init_is_refused() {
        // traced_test already installed a subscriber for this test.
        assert!(!try_init_logging(Some("debug")));
        tracing::info!("still logging");
        assert!(logs_contain("still logging"));
    }
}

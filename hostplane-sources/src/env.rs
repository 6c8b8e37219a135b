//! Process environment source.

use async_trait::async_trait;
use figment::providers::Env;
use tracing::debug;

use crate::{RawMap, RawSource, SourceError, SourceId};

pub const DEFAULT_ENV_PREFIX: &str = "FELIX_";

/// Reads `<PREFIX><NAME>` variables, e.g. `FELIX_IPTABLESLOCKTIMEOUT` or
/// `FELIX_IPTABLES_LOCK_TIMEOUT`.
///
/// Values are passed through untouched; typing is left to the registry.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Snapshot of the matching variables, keyed without the prefix.
    pub fn read(&self) -> RawMap {
        let values: RawMap = Env::prefixed(&self.prefix)
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect();
        debug!(prefix = %self.prefix, count = values.len(), "Collected environment overrides");
        values
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

#[async_trait]
impl RawSource for EnvSource {
    fn id(&self) -> SourceId {
        SourceId::Environment
    }

    async fn collect(&self) -> Result<RawMap, SourceError> {
        Ok(self.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn get<'a>(values: &'a RawMap, key: &str) -> Option<&'a str> {
        values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn reads_prefixed_variables_only() {
        Jail::expect_with(|jail| {
            jail.set_env("FELIX_IPTABLES_LOCK_TIMEOUT", "5");
            jail.set_env("FELIX_LOGSEVERITYSCREEN", "Debug");
            jail.set_env("OTHER_LOGSEVERITYSCREEN", "Error");

            let values = EnvSource::default().read();
            assert_eq!(get(&values, "iptables_lock_timeout"), Some("5"));
            assert_eq!(get(&values, "logseverityscreen"), Some("Debug"));
            assert!(!values.values().any(|v| v == "Error"));
            Ok(())
        });
    }

    #[test]
    fn values_are_not_type_sniffed() {
        Jail::expect_with(|jail| {
            jail.set_env("TEST_FAILSAFEINBOUNDHOSTPORTS", "tcp:22,udp:68");
            jail.set_env("TEST_IPTABLESMARKMASK", "0xffff0000");
            let values = EnvSource::new("TEST_").read();
            assert_eq!(get(&values, "failsafeinboundhostports"), Some("tcp:22,udp:68"));
            assert_eq!(get(&values, "iptablesmarkmask"), Some("0xffff0000"));
            Ok(())
        });
    }
}

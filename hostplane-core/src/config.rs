//! # Engine Configuration
//!
//! Settings for the resolution engine itself, as opposed to the agent
//! parameters it resolves.
//!
//! Hierarchy:
//! 1. Default values
//! 2. Optional YAML file
//! 3. `HOSTPLANE_*` environment variables

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use hostplane_sources::{
    DatastoreHandle, DatastoreSource, EnvSource, FileSource, RawSource, DEFAULT_ENV_PREFIX,
};

use crate::snapshot::FirstPassPolicy;
use crate::EngineError;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_engine_config"))]
pub struct EngineConfig {
    /// Prefix of agent parameters in the process environment.
    #[serde(default = "default_env_prefix")]
    #[validate(length(min = 1, max = 64))]
    pub env_prefix: String,

    /// Local override file; no file source when unset.
    #[serde(default)]
    pub config_file: Option<PathBuf>,

    /// Seconds between periodic passes. Accepts `10` or `"10s"`.
    #[serde(default = "default_poll_interval", deserialize_with = "deserialize_secs")]
    #[validate(range(min = 1, max = 3600))]
    pub poll_interval_secs: u64,

    /// Buffered updates per subscriber before a slow one starts lagging.
    #[serde(default = "default_channel_capacity")]
    #[validate(range(min = 1, max = 4096))]
    pub channel_capacity: usize,

    /// Report the first pass as changes from the built-in defaults.
    #[serde(default = "default_true")]
    pub emit_initial_changes: bool,
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.into()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_channel_capacity() -> usize {
    16
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            env_prefix: default_env_prefix(),
            config_file: None,
            poll_interval_secs: default_poll_interval(),
            channel_capacity: default_channel_capacity(),
            emit_initial_changes: default_true(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SecsValue {
    Num(u64),
    Str(String),
}

/// Accepts whole seconds or a human-readable duration such as `"1m"`.
fn deserialize_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SecsValue::deserialize(deserializer)? {
        SecsValue::Num(n) => Ok(n),
        SecsValue::Str(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<u64>() {
                return Ok(n);
            }
            humantime::parse_duration(s)
                .map(|d| d.as_secs())
                .map_err(serde::de::Error::custom)
        }
    }
}

fn validate_engine_config(config: &EngineConfig) -> Result<(), ValidationError> {
    if !config.channel_capacity.is_power_of_two() {
        return Err(ValidationError::new("channel_capacity_must_be_power_of_two"));
    }
    if !config
        .env_prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::new("invalid_env_prefix"));
    }
    Ok(())
}

impl EngineConfig {
    /// Loads defaults, then `path` if given, then `HOSTPLANE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(EngineError::FileNotFound(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file_exact(path));
        }

        figment
            .merge(Env::prefixed("HOSTPLANE_"))
            .extract()
            .map_err(EngineError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn first_pass_policy(&self) -> FirstPassPolicy {
        if self.emit_initial_changes {
            FirstPassPolicy::DiffAgainstDefaults
        } else {
            FirstPassPolicy::Suppress
        }
    }

    /// The standard source set: environment, the optional local file and
    /// both datastore objects fed through the given handles.
    pub fn sources(
        &self,
        per_host: DatastoreHandle,
        global: DatastoreHandle,
    ) -> Vec<Arc<dyn RawSource>> {
        let mut sources: Vec<Arc<dyn RawSource>> =
            vec![Arc::new(EnvSource::new(self.env_prefix.clone()))];
        if let Some(path) = &self.config_file {
            sources.push(Arc::new(FileSource::new(path.clone())));
        }
        sources.push(Arc::new(DatastoreSource::per_host(per_host)));
        sources.push(Arc::new(DatastoreSource::global(global)));
        sources
    }
}

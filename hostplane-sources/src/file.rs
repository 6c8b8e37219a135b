//! Local configuration file source.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use figment::providers::{Format, Json, Yaml};
use figment::Figment;
use tracing::debug;

use crate::flatten::flatten_object;
use crate::{RawMap, RawSource, SourceError, SourceId};

/// Reads overrides from a file on the local host.
///
/// `.yaml`, `.yml` and `.json` files are structured documents, optionally
/// wrapped in a `spec` object. Anything else is read as `key = value` lines
/// where `#` and `;` start comments and `[section]` headers are ignored.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

enum FileFormat {
    Yaml,
    Json,
    KeyValue,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> FileFormat {
        match self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::KeyValue,
        }
    }

    /// Reads the file as it is now.
    pub fn read(&self) -> Result<RawMap, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::FileNotFound(self.path.clone()));
        }
        let values = match self.format() {
            FileFormat::Yaml => {
                let doc: serde_json::Value =
                    Figment::from(Yaml::file_exact(&self.path)).extract()?;
                flatten_object(&doc)?
            }
            FileFormat::Json => {
                let doc: serde_json::Value =
                    Figment::from(Json::file_exact(&self.path)).extract()?;
                flatten_object(&doc)?
            }
            FileFormat::KeyValue => parse_key_values(&self.path, &fs::read_to_string(&self.path)?)?,
        };
        debug!(path = %self.path.display(), count = values.len(), "Collected file overrides");
        Ok(values)
    }
}

fn parse_key_values(path: &Path, contents: &str) -> Result<RawMap, SourceError> {
    let mut values = RawMap::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with('#')
            || line.starts_with(';')
            || (line.starts_with('[') && line.ends_with(']'))
        {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or_else(|| SourceError::Syntax {
            path: path.to_path_buf(),
            line: index + 1,
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SourceError::Syntax {
                path: path.to_path_buf(),
                line: index + 1,
            });
        }
        values.insert(key.to_string(), value.trim().to_string());
    }
    Ok(values)
}

#[async_trait]
impl RawSource for FileSource {
    fn id(&self) -> SourceId {
        SourceId::LocalFile
    }

    async fn collect(&self) -> Result<RawMap, SourceError> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn reads_ini_style_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "felix.cfg",
                r#"
                # Local overrides
                [global]
                LogSeverityScreen = Debug
                ; FailsafeInboundHostPorts = none
                IptablesLockTimeoutSecs=5
                "#,
            )?;
            let values = FileSource::new("felix.cfg").read().unwrap();
            assert_eq!(values.len(), 2);
            assert_eq!(values["LogSeverityScreen"], "Debug");
            assert_eq!(values["IptablesLockTimeoutSecs"], "5");
            Ok(())
        });
    }

    #[test]
    fn reports_malformed_lines() {
        Jail::expect_with(|jail| {
            jail.create_file("felix.cfg", "LogSeverityScreen = Debug\nnot a pair\n")?;
            let err = FileSource::new("felix.cfg").read().unwrap_err();
            assert!(matches!(err, SourceError::Syntax { line: 2, .. }));
            Ok(())
        });
    }

    #[test]
    fn reads_yaml_document() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "felix.yaml",
                concat!(
                    "spec:\n",
                    "  bpfEnabled: true\n",
                    "  routeRefreshInterval: 30s\n",
                    "  failsafeInboundHostPorts: []\n",
                    "  interfaceExclude:\n",
                    "    - kube-ipvs0\n",
                    "    - /^veth.*/\n",
                ),
            )?;
            let values = FileSource::new("felix.yaml").read().unwrap();
            assert_eq!(values["bpfEnabled"], "true");
            assert_eq!(values["routeRefreshInterval"], "30s");
            assert_eq!(values["failsafeInboundHostPorts"], "none");
            assert_eq!(values["interfaceExclude"], "kube-ipvs0,/^veth.*/");
            Ok(())
        });
    }

    #[test]
    fn reads_json_document() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "felix.json",
                r#"{"vxlanVNI": 4100, "logSeverityScreen": "Warning"}"#,
            )?;
            let values = FileSource::new("felix.json").read().unwrap();
            assert_eq!(values["vxlanVNI"], "4100");
            assert_eq!(values["logSeverityScreen"], "Warning");
            Ok(())
        });
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let err = FileSource::new("/nonexistent/felix.cfg")
            .collect()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::FileNotFound(_)));
    }
}

//! # Engine Configuration
//!
//! [`EngineConfig`] holds the engine-wide defaults an activity falls back to
//! when neither its translet rule nor an aspect setting decides.
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! default_encoding = "UTF-8"
//! max_forward_hops = 16
//! default_dispatcher = "templates"
//!
//! [properties]
//! "site.title" = "Demo"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Character encoding used when no rule or aspect setting names one.
    pub default_encoding: String,
    /// Upper bound on forward hops within one activity.
    pub max_forward_hops: usize,
    /// View dispatcher used by dispatch responses that do not name one.
    pub default_dispatcher: Option<String>,
    /// Content type assumed when picking an exception response variant.
    pub default_content_type: Option<String>,
    /// Values readable from `%{name}` tokens.
    pub properties: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_encoding: "UTF-8".to_string(),
            max_forward_hops: 32,
            default_dispatcher: None,
            default_content_type: None,
            properties: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        debug!(path = %path.display(), ?config, "Loaded engine configuration");
        Ok(config)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_apply_to_missing_keys() {
        let config = EngineConfig::from_toml_str("max_forward_hops = 4").expect("valid toml");
        assert_eq!(config.max_forward_hops, 4);
        assert_eq!(config.default_encoding, "UTF-8");
        assert!(config.properties.is_empty());
    }

    #[test]
    fn test_load_reads_properties_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "default_dispatcher = \"views\"\n\n[properties]\n\"site.title\" = \"Demo\""
        )
        .expect("write config");

        let config = EngineConfig::load(file.path()).expect("load config");
        assert_eq!(config.default_dispatcher.as_deref(), Some("views"));
        assert_eq!(config.property("site.title"), Some("Demo"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! Configuration management for zapwatch.
//!
//! Loads settings from a TOML file or uses defaults. Every field has a
//! default so a partial (or absent) file is valid.

use crate::classifier::{default_rules, ClassifierRule};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file looked up when no path is given
pub const CONFIG_PATH: &str = "zapwatch.toml";

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding index.html and other frontend assets
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    10000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            cors_origins: Vec::new(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Cap applied to unfiltered listings and exports
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("logs.db")
}

fn default_list_limit() -> usize {
    crate::store::DEFAULT_LIST_LIMIT
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            list_limit: default_list_limit(),
        }
    }
}

/// Classifier rule table, in match order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_rules")]
    pub rules: Vec<ClassifierRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZapwatchConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl ZapwatchConfig {
    /// Load from `path`, or from [`CONFIG_PATH`] when `None`.
    ///
    /// A missing file yields defaults. A file that exists but does not parse
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));

        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.classifier.rules.is_empty() {
            warn!("Classifier rule table is empty; every log gets the fallback explanation");
        }
        Ok(config)
    }

    /// Apply the `PORT` environment variable, as hosting platforms set it
    pub fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var("PORT") {
            self.apply_port_override(&raw);
        }
    }

    fn apply_port_override(&mut self, raw: &str) {
        match raw.trim().parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(_) => warn!("Ignoring invalid PORT value '{}'", raw),
        }
    }

    /// Address string for the TCP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ZapwatchConfig::default();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.bind_addr(), "0.0.0.0:10000");
        assert_eq!(config.storage.db_path, PathBuf::from("logs.db"));
        assert_eq!(config.storage.list_limit, 1000);
        assert_eq!(config.classifier.rules.len(), 5);
        assert!(config.server.cors_origins.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ZapwatchConfig::from_toml(
            r#"
            [server]
            port = 8080

            [storage]
            db_path = "/tmp/zap.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.db_path, PathBuf::from("/tmp/zap.db"));
        assert_eq!(config.storage.list_limit, 1000);
        assert_eq!(config.classifier.rules[0].pattern, "not found");
    }

    #[test]
    fn test_custom_classifier_rules() {
        let config = ZapwatchConfig::from_toml(
            r#"
            [[classifier.rules]]
            pattern = "timeout"
            explanation = "Upstream too slow"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.rules.len(), 1);
        assert_eq!(config.classifier.rules[0].explanation, "Upstream too slow");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(ZapwatchConfig::from_toml("[server\nport = ").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ZapwatchConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.server.port, 10000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zapwatch.toml");
        fs::write(&path, "[server]\nhost = \"127.0.0.1\"\n").unwrap();

        let config = ZapwatchConfig::load(Some(&path)).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:10000");
    }

    #[test]
    fn test_port_override() {
        let mut config = ZapwatchConfig::default();
        config.apply_port_override("8123");
        assert_eq!(config.server.port, 8123);

        config.apply_port_override("not-a-port");
        assert_eq!(config.server.port, 8123);
    }
}

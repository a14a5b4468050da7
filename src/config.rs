//! Server configuration.
//!
//! Precedence: `S3EMU_CONFIG` env var pointing at a TOML file, then the
//! default file locations, then per-field environment overrides, then
//! hardcoded defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATHS: &[&str] = &["s3emu.toml", "/etc/s3emu/config.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Filesystem root for bucket/object storage. Empty means a fresh
    /// temp directory is generated at startup.
    #[serde(default)]
    pub root: String,

    /// Keep the data directory on disk when the process exits instead of
    /// wiping it.
    #[serde(default = "default_retain_files_on_exit")]
    pub retain_files_on_exit: bool,

    /// Buckets to create at startup if they do not already exist.
    #[serde(default)]
    pub initial_buckets: Vec<String>,

    /// KMS key ids accepted for SSE-KMS writes. Any other key id is
    /// rejected with `KMS.NotFoundException`.
    #[serde(default)]
    pub valid_kms_keys: Vec<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default = "default_https_port")]
    pub https_port: u16,

    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

fn default_retain_files_on_exit() -> bool {
    false
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_http_port() -> u16 {
    9090
}

fn default_https_port() -> u16 {
    9191
}

fn default_verbose() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: String::new(),
            retain_files_on_exit: default_retain_files_on_exit(),
            initial_buckets: Vec::new(),
            valid_kms_keys: Vec::new(),
            region: default_region(),
            http_port: default_http_port(),
            https_port: default_https_port(),
            verbose: default_verbose(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Apply per-field environment overrides on top of whatever was loaded
    /// from a config file (or the defaults).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("S3EMU_ROOT") {
            self.root = root;
        }
        if let Ok(v) = std::env::var("S3EMU_RETAIN_FILES_ON_EXIT") {
            self.retain_files_on_exit = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("S3EMU_INITIAL_BUCKETS") {
            self.initial_buckets = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("S3EMU_VALID_KMS_KEYS") {
            self.valid_kms_keys = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(region) = std::env::var("S3EMU_REGION") {
            self.region = region;
        }
        if let Ok(v) = std::env::var("S3EMU_HTTP_PORT") {
            if let Ok(port) = v.parse() {
                self.http_port = port;
            }
        }
        if let Ok(v) = std::env::var("S3EMU_HTTPS_PORT") {
            if let Ok(port) = v.parse() {
                self.https_port = port;
            }
        }
    }

    /// Load configuration: explicit `S3EMU_CONFIG` path, then the default
    /// file locations, then bare defaults — env overrides apply on top of
    /// whichever base was found.
    pub fn load() -> Self {
        let mut config = if let Ok(path) = std::env::var("S3EMU_CONFIG") {
            Self::from_file(&path).unwrap_or_default()
        } else {
            DEFAULT_CONFIG_PATHS
                .iter()
                .find(|p| std::path::Path::new(p).exists())
                .and_then(|p| Self::from_file(p).ok())
                .unwrap_or_default()
        };
        config.apply_env_overrides();
        config
    }

    /// Resolve the storage root, generating a fresh temp directory when
    /// none was configured.
    pub fn data_dir(&self) -> PathBuf {
        if self.root.is_empty() {
            let millis = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            std::env::temp_dir().join(format!("s3mockFileStore{millis}"))
        } else {
            PathBuf::from(&self.root)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_ports() {
        let config = Config::default();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.https_port, 9191);
        assert!(!config.retain_files_on_exit);
    }

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
            root = "/var/lib/s3emu"
            region = "eu-west-1"
            initial_buckets = ["a", "b"]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.root, "/var/lib/s3emu");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.initial_buckets, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(config.http_port, 9090);
    }

    #[test]
    fn data_dir_uses_configured_root_when_set() {
        let config = Config {
            root: "/srv/s3emu-data".to_string(),
            ..Config::default()
        };
        assert_eq!(config.data_dir(), PathBuf::from("/srv/s3emu-data"));
    }
}

//! Configuration loading and management
//!
//! Handles `config.toml` inside the power6 data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::DEFAULT_STORE_FILE;

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the data directory
pub const HOME_ENV: &str = "POWER6_HOME";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote backend settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Local store settings
    #[serde(default)]
    pub store: StoreConfig,
}

/// Remote backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Talk to the backend at all; when off every remote call is unavailable
    #[serde(default)]
    pub enabled: bool,

    /// Backend base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for any single request
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Local store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file name, relative to the data directory
    #[serde(default = "default_store_file")]
    pub file: String,

    /// How long to wait for the store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_store_file() -> String {
    DEFAULT_STORE_FILE.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: default_store_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(Error::InvalidConfig(
                "remote.base_url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "remote.base_url '{url}' must start with http:// or https://"
            )));
        }
        if self.timeout_ms == 0 || self.timeout_ms > 120_000 {
            return Err(Error::InvalidConfig(
                "remote.timeout_ms must be between 1 and 120000".to_string(),
            ));
        }
        Ok(())
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<()> {
        let file = self.file.trim();
        if file.is_empty() {
            return Err(Error::InvalidConfig(
                "store.file cannot be empty".to_string(),
            ));
        }
        if file.contains('/') || file.contains('\\') {
            return Err(Error::InvalidConfig(format!(
                "store.file '{file}' must be a plain file name"
            )));
        }
        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config.toml` from the data directory, or return defaults
    ///
    /// An unreadable or invalid file falls back to defaults with a warning.
    pub fn load_from_dir(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Absolute path of the store file for `data_dir`
    pub fn store_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.store.file.trim())
    }

    fn validate(&self) -> Result<()> {
        self.remote.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Resolve the data directory: explicit flag/env, platform data dir, `./.power6`
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    directories::ProjectDirs::from("", "", "power6")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".power6"))
}

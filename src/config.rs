use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::core::{ClientError, Result};
use crate::sync::{SyncConfig, SyncMode, DEFAULT_PAGE_SIZE};

pub const ENDPOINT_ENV: &str = "EXTRACTION_ENDPOINT";
pub const STORAGE_DIR_ENV: &str = "EXTRACTION_STORAGE_DIR";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the extraction service
    pub endpoint: String,
    /// Directory of the local ledger and settings
    pub storage_dir: PathBuf,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    pub sync_mode: SyncMode,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000".to_string(),
            storage_dir: PathBuf::from(".extraction-client"),
            poll_interval_secs: 3,
            request_timeout_secs: 60,
            page_size: DEFAULT_PAGE_SIZE,
            sync_mode: SyncMode::Summary,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| ClientError::Config(err.to_string()))
    }

    /// Read, apply environment overrides, validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| ClientError::Config(format!("Cannot read {}: {}", path.display(), err)))?;

        let mut config = Self::from_toml(&raw)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields the defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        tracing::debug!(path = %path.display(), "No config file, using defaults");
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(STORAGE_DIR_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, storage_dir: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|v| !v.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(storage_dir) = storage_dir.filter(|v| !v.is_empty()) {
            self.storage_dir = PathBuf::from(storage_dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint)
            .map_err(|err| ClientError::Config(format!("Invalid endpoint {}: {}", self.endpoint, err)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!("Unsupported endpoint scheme: {}", url.scheme())));
        }

        if self.poll_interval_secs == 0 {
            return Err(ClientError::Config("poll_interval_secs must be positive".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Config("request_timeout_secs must be positive".to_string()));
        }
        if self.page_size == 0 {
            return Err(ClientError::Config("page_size must be positive".to_string()));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            page_size: self.page_size,
            mode: self.sync_mode,
        }
    }
}

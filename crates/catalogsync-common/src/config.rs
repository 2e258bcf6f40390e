//! Configuration types for CatalogSync
//!
//! This module defines configuration structures used across components.
//! Every field has a serde default so partial TOML files are accepted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for CatalogSync
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Local catalog storage
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Remote version check and delta fetch
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local catalog storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Prefix for the persisted keys (`<ns>:version`, `<ns>:last_check`, `<ns>:ledger`)
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Bundled baseline snapshot (JSON)
    #[serde(default)]
    pub baseline_path: Option<PathBuf>,
    /// Directory holding the persistent key-value store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            baseline_path: None,
            data_dir: default_data_dir(),
        }
    }
}

/// Sync scheduler configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Run version checks at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the catalog service
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Minimum time between two version checks (seconds)
    #[serde(default = "default_throttle_secs")]
    pub throttle_secs: u64,
    /// Upper bound on each remote call (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl SyncConfig {
    #[must_use]
    pub const fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            throttle_secs: default_throttle_secs(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_namespace() -> String {
    "catalog".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./catalog-data")
}

const fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:8080/catalog".to_string()
}

const fn default_throttle_secs() -> u64 {
    90 * 60
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

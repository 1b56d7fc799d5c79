//! Daemon configuration.

use crate::error::{AppError, AppResult};
use ibgw_pool::PoolConfig;
use ibgw_runtime::GatewayImageConfig;
use ibgw_secrets::SecretStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Status endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusServerConfig {
    /// Bind address for the status/metrics endpoint.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for StatusServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the tenant roster file.
    #[serde(default = "default_roster_path")]
    pub roster_path: String,
    /// How often the roster is re-read and diffed (seconds).
    #[serde(default = "default_roster_refresh_secs")]
    pub roster_refresh_secs: u64,
    /// Pool manager settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Gateway image settings.
    #[serde(default)]
    pub gateway: GatewayImageConfig,
    /// Secret store settings.
    #[serde(default)]
    pub secret_store: SecretStoreConfig,
    /// Status endpoint settings.
    #[serde(default)]
    pub status: StatusServerConfig,
}

fn default_roster_path() -> String {
    "config/tenants.toml".to_string()
}

fn default_roster_refresh_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roster_path: default_roster_path(),
            roster_refresh_secs: default_roster_refresh_secs(),
            pool: PoolConfig::default(),
            gateway: GatewayImageConfig::default(),
            secret_store: SecretStoreConfig::default(),
            status: StatusServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration, falling back to defaults when the file is
    /// absent.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("IBGW_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}

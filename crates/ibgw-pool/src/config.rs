//! Pool manager configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect backoff parameters.
///
/// Base delay doubles per attempt; attempts stop at `max_attempts` or
/// when the total window is spent, whichever comes first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Maximum reconnect attempts before the instance fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff (ms).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Total retry window (ms).
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    2_000
}

fn default_window_ms() -> u64 {
    60_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            window_ms: default_window_ms(),
        }
    }
}

/// Pool manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// First host port handed to a gateway.
    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,
    /// Last host port (inclusive).
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,
    /// First client session id.
    #[serde(default = "default_client_id_range_start")]
    pub client_id_range_start: u32,
    /// Last client session id (inclusive).
    #[serde(default = "default_client_id_range_end")]
    pub client_id_range_end: u32,
    /// Deadline for a launched gateway to become live (ms).
    #[serde(default = "default_max_startup_ms")]
    pub max_startup_ms: u64,
    /// Health check tick interval (ms).
    #[serde(default = "default_healthcheck_interval_ms")]
    pub healthcheck_interval_ms: u64,
    /// Graceful per-container stop timeout (ms).
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// Global shutdown grace period (ms).
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Reconnect backoff parameters.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_port_range_start() -> u16 {
    4100
}

fn default_port_range_end() -> u16 {
    4200
}

fn default_client_id_range_start() -> u32 {
    1000
}

fn default_client_id_range_end() -> u32 {
    9999
}

fn default_max_startup_ms() -> u64 {
    120_000
}

fn default_healthcheck_interval_ms() -> u64 {
    30_000
}

fn default_stop_timeout_ms() -> u64 {
    10_000
}

fn default_shutdown_grace_ms() -> u64 {
    60_000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
            client_id_range_start: default_client_id_range_start(),
            client_id_range_end: default_client_id_range_end(),
            max_startup_ms: default_max_startup_ms(),
            healthcheck_interval_ms: default_healthcheck_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl PoolConfig {
    pub fn max_startup(&self) -> Duration {
        Duration::from_millis(self.max_startup_ms)
    }

    pub fn healthcheck_interval(&self) -> Duration {
        Duration::from_millis(self.healthcheck_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// A RUNNING instance whose heartbeat is older than this is stale
    /// and must not be handed out.
    pub fn heartbeat_freshness(&self) -> Duration {
        Duration::from_millis(self.healthcheck_interval_ms * 2)
    }

    /// Backoff delay before reconnect attempt `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped at the total window.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = self
            .reconnect
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.reconnect.window_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.port_range_start, 4100);
        assert_eq!(config.port_range_end, 4200);
        assert_eq!(config.client_id_range_start, 1000);
        assert_eq!(config.client_id_range_end, 9999);
        assert_eq!(config.max_startup_ms, 120_000);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.window_ms, 60_000);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = PoolConfig {
            reconnect: ReconnectConfig {
                max_attempts: 5,
                base_delay_ms: 1_000,
                window_ms: 60_000,
            },
            ..Default::default()
        };
        assert_eq!(config.backoff_delay(1), Duration::from_millis(1_000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(2_000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(4_000));
        // Never exceeds the window.
        assert_eq!(config.backoff_delay(10), Duration::from_millis(60_000));
    }

    #[test]
    fn test_heartbeat_freshness_twice_interval() {
        let config = PoolConfig {
            healthcheck_interval_ms: 30_000,
            ..Default::default()
        };
        assert_eq!(config.heartbeat_freshness(), Duration::from_secs(60));
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let config: PoolConfig = serde_json::from_str(r#"{"max_startup_ms": 5000}"#).unwrap();
        assert_eq!(config.max_startup_ms, 5000);
        assert_eq!(config.port_range_start, 4100);
    }
}

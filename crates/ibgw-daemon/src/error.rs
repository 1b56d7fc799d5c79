//! Daemon error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pool error: {0}")]
    Pool(#[from] ibgw_pool::PoolError),

    #[error("Secrets error: {0}")]
    Secrets(#[from] ibgw_secrets::SecretsError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ibgw_protocol::ProtocolError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] ibgw_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

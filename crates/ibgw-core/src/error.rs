//! Error types for ibgw-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid tenant id: {0}")]
    InvalidTenantId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Roster source error: {0}")]
    Roster(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

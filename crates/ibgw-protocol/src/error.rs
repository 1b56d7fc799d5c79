//! Protocol error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Gateway unreachable at {host}:{port}: {reason}")]
    Unreachable {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("Authentication rejected by gateway: HTTP {status}")]
    AuthRejected { status: u16 },

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

//! Secret store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("Secret store unreachable: {0}")]
    Unreachable(String),

    #[error("Secret store request failed: HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Secret at {path} has an unrecognized shape")]
    UnrecognizedShape { path: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type SecretsResult<T> = Result<T, SecretsError>;

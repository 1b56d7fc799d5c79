//! Runtime error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessRuntimeError {
    #[error("{action} failed for {container}: {stderr}")]
    CommandFailed {
        action: &'static str,
        container: String,
        stderr: String,
    },

    #[error("Failed to spawn runtime command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Unexpected runtime output for {container}: {output}")]
    UnexpectedOutput { container: String, output: String },
}

pub type RuntimeResult<T> = Result<T, ProcessRuntimeError>;

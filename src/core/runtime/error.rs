//! Container-runtime error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Container runtime not available: {0}")]
    Unavailable(String),

    #[error("Container '{name}' not found")]
    NotFound { name: String },

    #[error("Container name '{name}' is already in use")]
    Conflict { name: String },

    #[error("Runtime command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Malformed runtime response: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

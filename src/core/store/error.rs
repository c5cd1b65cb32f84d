//! Object-store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Object store transport error: {0}")]
    Transport(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

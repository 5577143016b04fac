//! Error types for Lockbox core types.

use thiserror::Error;

/// Errors raised while constructing or parsing core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid record type: {0}")]
    InvalidRecordType(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

//! Error types for remote store connections.

use thiserror::Error;

use lockbox_core::{RecordId, ResourceKind, Version};

/// Errors that a [`Connection`](crate::Connection) can return.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The requested resource does not exist (or is not addressed to us).
    #[error("404 {kind} NOT FOUND: {id}")]
    NotFound { kind: ResourceKind, id: String },

    /// An update carried a stale version.
    #[error("conflict updating record {record_id}: version {expected} is stale")]
    Conflict { record_id: RecordId, expected: Version },

    /// Authentication failed or the caller may not perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or response body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The service answered with an unexpected status.
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },
}

impl ConnectionError {
    /// Shorthand for a not-found error.
    pub fn not_found(kind: ResourceKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for connection operations.
pub type Result<T> = std::result::Result<T, ConnectionError>;

//! Error types for the client facade.

use lockbox_core::{CoreError, RecordId, ResourceKind, Version};
use lockbox_crypto::CryptoError;
use lockbox_store::ConnectionError;
use thiserror::Error;

/// Errors that can occur during client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A client, record or access key does not exist.
    #[error("404 {kind} NOT FOUND: {id}")]
    NotFound { kind: ResourceKind, id: String },

    /// An update carried a stale version. Nothing was changed.
    #[error("conflict updating record {record_id}: version {version} is stale")]
    Conflict { record_id: RecordId, version: Version },

    /// Decryption or key unwrapping failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Attempted to replace a field fixed at construction.
    #[error("{field} is immutable")]
    Immutable { field: &'static str },

    /// Any other transport or service failure.
    #[error("transport error: {0}")]
    Transport(ConnectionError),

    /// The operation is not allowed.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid input (ids, record types, configuration).
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl ClientError {
    /// Whether this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a stale-version conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<ConnectionError> for ClientError {
    fn from(e: ConnectionError) -> Self {
        match e {
            ConnectionError::NotFound { kind, id } => Self::NotFound { kind, id },
            ConnectionError::Conflict {
                record_id,
                expected,
            } => Self::Conflict {
                record_id,
                version: expected,
            },
            other => Self::Transport(other),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_route_to_dedicated_variants() {
        let nf: ClientError = ConnectionError::not_found(ResourceKind::Record, "abc").into();
        assert!(nf.is_not_found());
        assert_eq!(nf.to_string(), "404 RECORD NOT FOUND: abc");

        let conflict: ClientError = ConnectionError::Conflict {
            record_id: RecordId::generate(),
            expected: Version::generate(),
        }
        .into();
        assert!(conflict.is_conflict());

        let transport: ClientError = ConnectionError::Transport("down".into()).into();
        assert!(matches!(transport, ClientError::Transport(_)));
        assert!(!transport.is_not_found());
    }
}

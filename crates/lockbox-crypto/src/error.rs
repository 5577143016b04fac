//! Error types for the crypto engine.

use thiserror::Error;

/// Errors that can occur while encrypting, decrypting or wrapping keys.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Ciphertext or a wrapped key does not have the expected shape.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// AEAD authentication failed: wrong key, wrong peer, or tampered data.
    #[error("authentication failed")]
    Authentication,

    /// Encryption itself failed.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// A wrapped-key structure could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

//! Transport-safe text encoding.
//!
//! All binary values that leave the process (keys, nonces, ciphertext) are
//! URL-safe base64 with no padding, so they can sit in URLs, JSON bodies
//! and dot-separated field formats without escaping.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::{CoreError, Result};

/// Encode bytes as URL-safe base64 without padding.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe base64 without padding.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| CoreError::InvalidEncoding(e.to_string()))
}

/// Decode into a fixed-size array, failing if the length differs.
pub fn decode_array<const N: usize>(text: &str) -> Result<[u8; N]> {
    let bytes = decode(text)?;
    bytes.as_slice().try_into().map_err(|_| {
        CoreError::InvalidEncoding(format!("expected {N} bytes, got {}", bytes.len()))
    })
}

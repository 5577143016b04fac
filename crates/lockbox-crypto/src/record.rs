//! Record field encryption.
//!
//! Each field is sealed independently under its own random data key, and the
//! data key is sealed under the record type's access key. A field ciphertext
//! is four dot-separated base64url segments:
//!
//! ```text
//! edk.edkN.ef.efN
//! ```
//!
//! encrypted data key, its nonce, encrypted field, its nonce. Only field
//! values pass through here; record metadata stays in plaintext.

use lockbox_core::{encoding, FieldMap};

use crate::error::{CryptoError, Result};
use crate::keys::{AccessKey, Nonce, SymmetricKey};

/// Encrypt a single field value.
pub fn encrypt_field(access_key: &AccessKey, value: &str) -> Result<String> {
    let data_key = SymmetricKey::generate();

    let dk_nonce = Nonce::generate();
    let edk = access_key.key().encrypt(data_key.as_bytes(), &dk_nonce)?;

    let field_nonce = Nonce::generate();
    let ef = data_key.encrypt(value.as_bytes(), &field_nonce)?;

    Ok(format!(
        "{}.{}.{}.{}",
        encoding::encode(&edk),
        encoding::encode(dk_nonce.as_bytes()),
        encoding::encode(&ef),
        encoding::encode(field_nonce.as_bytes()),
    ))
}

/// Decrypt a single field value.
pub fn decrypt_field(access_key: &AccessKey, ciphertext: &str) -> Result<String> {
    let parts: Vec<&str> = ciphertext.split('.').collect();
    let [edk, edk_nonce, ef, ef_nonce] = parts.as_slice() else {
        return Err(CryptoError::Malformed(format!(
            "expected 4 segments, got {}",
            parts.len()
        )));
    };

    let edk = decode(edk)?;
    let dk_nonce = Nonce::from_slice(&decode(edk_nonce)?)?;
    let ef = decode(ef)?;
    let field_nonce = Nonce::from_slice(&decode(ef_nonce)?)?;

    let dk_bytes = access_key.key().decrypt(&edk, &dk_nonce)?;
    let data_key = SymmetricKey::from_slice(&dk_bytes)?;
    let plaintext = data_key.decrypt(&ef, &field_nonce)?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Malformed("field is not valid UTF-8".into()))
}

/// Encrypt every value of a field map under an access key.
///
/// Identical values yield different ciphertext, since every field gets a
/// fresh data key and fresh nonces.
pub fn encrypt_record(access_key: &AccessKey, fields: &FieldMap) -> Result<FieldMap> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), encrypt_field(access_key, value)?)))
        .collect()
}

/// Decrypt every value of a field map. Fails on the first bad field.
pub fn decrypt_record(access_key: &AccessKey, fields: &FieldMap) -> Result<FieldMap> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decrypt_field(access_key, value)?)))
        .collect()
}

fn decode(segment: &str) -> Result<Vec<u8>> {
    encoding::decode(segment).map_err(|e| CryptoError::Malformed(e.to_string()))
}

//! Key material and the AEAD primitive.
//!
//! Provides X25519 key agreement and ChaCha20-Poly1305 authenticated
//! encryption. Every symmetric key in the crate is a [`SymmetricKey`]; an
//! [`AccessKey`] is the one scoped to a (writer, record type) pair.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce as AeadNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{PublicKey as DalekPublic, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use lockbox_core::{PrivateKey, PublicKey, KEY_SIZE};

use crate::error::{CryptoError, Result};

/// Size of a ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A 256-bit ChaCha20-Poly1305 key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, failing unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::Malformed(format!(
                "invalid key length: expected {KEY_SIZE}, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt data with this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &Nonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        cipher
            .encrypt(AeadNonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))
    }

    /// Decrypt data with this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        cipher
            .decrypt(AeadNonce::from_slice(&nonce.0), ciphertext)
            .map_err(|_| CryptoError::Authentication)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// The symmetric key for every record of one (writer, type) pair.
///
/// Lives only in process memory. It leaves the process wrapped, see
/// [`wrap_key`](crate::wrap_key).
#[derive(Clone)]
pub struct AccessKey(SymmetricKey);

impl AccessKey {
    /// Generate a fresh random access key.
    pub fn generate() -> Self {
        Self(SymmetricKey::generate())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(SymmetricKey::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        self.0.as_bytes()
    }

    pub(crate) fn key(&self) -> &SymmetricKey {
        &self.0
    }
}

impl PartialEq for AccessKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for AccessKey {}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey(<redacted>)")
    }
}

/// Generate a fresh random access key.
pub fn generate_access_key() -> AccessKey {
    AccessKey::generate()
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, failing unless it is exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes.try_into().map(Self).map_err(|_| {
            CryptoError::Malformed(format!(
                "invalid nonce length: expected {NONCE_SIZE}, got {}",
                bytes.len()
            ))
        })
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// A Curve25519 identity keypair.
#[derive(Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut seed = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut seed);
        let keypair = Self::from_private(PrivateKey::from_bytes(seed));
        seed.zeroize();
        keypair
    }

    /// Rebuild a keypair from its private half.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = public_key_of(&private);
        Self { public, private }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Derive the public key that belongs to a private key.
pub fn public_key_of(private: &PrivateKey) -> PublicKey {
    let secret = StaticSecret::from(*private.as_bytes());
    PublicKey::from_bytes(*DalekPublic::from(&secret).as_bytes())
}

/// A shared secret derived from static-static X25519 key agreement.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SharedKey([u8; KEY_SIZE]);

impl SharedKey {
    /// Agree on a shared secret between our private key and a peer's public key.
    pub(crate) fn agree(own_private: &PrivateKey, peer_public: &PublicKey) -> Self {
        let secret = StaticSecret::from(*own_private.as_bytes());
        let shared = secret.diffie_hellman(&DalekPublic::from(*peer_public.as_bytes()));
        Self(*shared.as_bytes())
    }

    /// Derive a symmetric key from this shared secret.
    ///
    /// The context binds the derived key to its use; BLAKE3 `derive_key`
    /// provides the domain separation.
    pub(crate) fn derive_key(&self, domain: &str, context: &[u8]) -> SymmetricKey {
        let mut hasher = blake3::Hasher::new_derive_key(domain);
        hasher.update(&self.0);
        hasher.update(context);
        SymmetricKey(*hasher.finalize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_agreement_is_symmetric() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        let ab = SharedKey::agree(&alice.private, &bob.public);
        let ba = SharedKey::agree(&bob.private, &alice.public);

        assert_eq!(ab.0, ba.0);
    }

    #[test]
    fn test_keypair_from_private_matches() {
        let kp = KeyPair::generate();
        let rebuilt = KeyPair::from_private(kp.private.clone());
        assert_eq!(kp.public, rebuilt.public);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = SymmetricKey::generate();
        let nonce = Nonce::generate();
        let plaintext = b"hello, world!";

        let ciphertext = key.encrypt(plaintext, &nonce).unwrap();
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = key.decrypt(&ciphertext, &nonce).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = SymmetricKey::generate();
        let key2 = SymmetricKey::generate();
        let nonce = Nonce::generate();

        let ciphertext = key1.encrypt(b"secret", &nonce).unwrap();

        assert!(matches!(
            key2.decrypt(&ciphertext, &nonce),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_key_derivation_separates_contexts() {
        let shared = SharedKey([0x42; KEY_SIZE]);

        let a1 = shared.derive_key("lockbox test", b"context-a");
        let a2 = shared.derive_key("lockbox test", b"context-a");
        let b = shared.derive_key("lockbox test", b"context-b");

        assert_eq!(a1.as_bytes(), a2.as_bytes());
        assert_ne!(a1.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_access_keys_are_random() {
        assert_ne!(generate_access_key(), generate_access_key());
    }

    #[test]
    fn test_debug_never_prints_key_bytes() {
        let key = AccessKey::from_bytes([0x5a; KEY_SIZE]);
        assert_eq!(format!("{key:?}"), "AccessKey(<redacted>)");
    }

    #[test]
    fn test_slice_length_checked() {
        assert!(SymmetricKey::from_slice(&[0u8; 31]).is_err());
        assert!(Nonce::from_slice(&[0u8; 13]).is_err());
        assert!(Nonce::from_slice(&[0u8; 12]).is_ok());
    }
}

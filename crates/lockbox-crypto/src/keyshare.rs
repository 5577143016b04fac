//! Access-key wrapping for sharing.
//!
//! An access key is wrapped for one reader with static-static X25519: the
//! sender's private key and the reader's public key agree on a secret, BLAKE3
//! turns it into a wrap key bound to both public keys, and ChaCha20-Poly1305
//! seals the access key. Only the holder of the sender's private key can
//! produce a wrap that the reader accepts as coming from that sender.
//!
//! The wrapped key travels as base64url CBOR of a [`WrappedKey`]
//! (`format`, 12-byte `nonce`, 48-byte `ciphertext`).

use serde::{Deserialize, Serialize};

use lockbox_core::{encoding, PrivateKey, PublicKey};

use crate::error::{CryptoError, Result};
use crate::keys::{public_key_of, AccessKey, Nonce, SharedKey, SymmetricKey};

const WRAP_DOMAIN: &str = "lockbox 2024-01 access-key wrap";

/// Format identifier for wrapped keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum WrapFormat {
    /// X25519 + BLAKE3 + ChaCha20-Poly1305.
    X25519ChaCha20Poly1305 = 1,
}

/// A wrapped access key, as carried inside the transport string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Wrapping scheme.
    pub format: WrapFormat,

    /// Nonce used for the wrap.
    pub nonce: Nonce,

    /// The encrypted access key (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl WrappedKey {
    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CryptoError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CryptoError::Serialization(e.to_string()))
    }

    /// Encode as transport-safe text.
    pub fn to_text(&self) -> Result<String> {
        Ok(encoding::encode(self.to_bytes()?))
    }

    /// Decode from transport-safe text.
    pub fn from_text(text: &str) -> Result<Self> {
        let bytes = encoding::decode(text).map_err(|e| CryptoError::Malformed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

fn wrap_key_for(
    own_private: &PrivateKey,
    peer_public: &PublicKey,
    sender: &PublicKey,
    recipient: &PublicKey,
) -> SymmetricKey {
    let mut context = Vec::with_capacity(64);
    context.extend_from_slice(sender.as_bytes());
    context.extend_from_slice(recipient.as_bytes());
    SharedKey::agree(own_private, peer_public).derive_key(WRAP_DOMAIN, &context)
}

/// Wrap an access key for a recipient.
///
/// Returns the transport-safe text form of the wrapped key.
pub fn wrap_key(
    access_key: &AccessKey,
    sender_private: &PrivateKey,
    recipient_public: &PublicKey,
) -> Result<String> {
    let sender_public = public_key_of(sender_private);
    let wrap = wrap_key_for(sender_private, recipient_public, &sender_public, recipient_public);

    let nonce = Nonce::generate();
    let ciphertext = wrap.encrypt(access_key.as_bytes(), &nonce)?;

    WrappedKey {
        format: WrapFormat::X25519ChaCha20Poly1305,
        nonce,
        ciphertext,
    }
    .to_text()
}

/// Unwrap an access key addressed to us.
///
/// Fails with [`CryptoError::Authentication`] if the blob was wrapped by
/// someone other than `sender_public`, for someone other than us, or was
/// tampered with.
pub fn unwrap_key(
    blob: &str,
    sender_public: &PublicKey,
    own_private: &PrivateKey,
) -> Result<AccessKey> {
    let wrapped = WrappedKey::from_text(blob)?;
    let own_public = public_key_of(own_private);

    let key_bytes = match wrapped.format {
        WrapFormat::X25519ChaCha20Poly1305 => {
            let wrap = wrap_key_for(own_private, sender_public, sender_public, &own_public);
            wrap.decrypt(&wrapped.ciphertext, &wrapped.nonce)?
        }
    };

    let key = SymmetricKey::from_slice(&key_bytes)?;
    Ok(AccessKey::from_bytes(*key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use proptest::prelude::*;

    #[test]
    fn test_wrap_roundtrip() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let ak = AccessKey::generate();

        let blob = wrap_key(&ak, &alice.private, &bob.public).unwrap();
        let recovered = unwrap_key(&blob, &alice.public, &bob.private).unwrap();

        assert_eq!(ak, recovered);
    }

    #[test]
    fn test_wrap_to_self() {
        let alice = KeyPair::generate();
        let ak = AccessKey::generate();

        let blob = wrap_key(&ak, &alice.private, &alice.public).unwrap();
        assert_eq!(unwrap_key(&blob, &alice.public, &alice.private).unwrap(), ak);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let eve = KeyPair::generate();
        let ak = AccessKey::generate();

        let blob = wrap_key(&ak, &alice.private, &bob.public).unwrap();

        assert!(matches!(
            unwrap_key(&blob, &alice.public, &eve.private),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_wrong_sender_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mallory = KeyPair::generate();
        let ak = AccessKey::generate();

        // Mallory wraps for Bob, Bob expects Alice.
        let blob = wrap_key(&ak, &mallory.private, &bob.public).unwrap();

        assert!(matches!(
            unwrap_key(&blob, &alice.public, &bob.private),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_tampered_blob_fails() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let ak = AccessKey::generate();

        let blob = wrap_key(&ak, &alice.private, &bob.public).unwrap();
        let mut wrapped = WrappedKey::from_text(&blob).unwrap();
        wrapped.ciphertext[3] ^= 0xff;
        let tampered = wrapped.to_text().unwrap();

        assert!(unwrap_key(&tampered, &alice.public, &bob.private).is_err());
    }

    #[test]
    fn test_garbage_blob_rejected() {
        let bob = KeyPair::generate();
        assert!(matches!(
            unwrap_key("not base64!", &bob.public, &bob.private),
            Err(CryptoError::Malformed(_))
        ));
        assert!(matches!(
            unwrap_key("AAAA", &bob.public, &bob.private),
            Err(CryptoError::Serialization(_))
        ));
    }

    proptest! {
        #[test]
        fn test_unwrap_inverts_wrap(
            key in any::<[u8; 32]>(),
            sender_seed in any::<[u8; 32]>(),
            recipient_seed in any::<[u8; 32]>(),
        ) {
            let sender = KeyPair::from_private(PrivateKey::from_bytes(sender_seed));
            let recipient = KeyPair::from_private(PrivateKey::from_bytes(recipient_seed));
            let ak = AccessKey::from_bytes(key);

            let blob = wrap_key(&ak, &sender.private, &recipient.public).unwrap();
            let recovered = unwrap_key(&blob, &sender.public, &recipient.private).unwrap();
            prop_assert_eq!(recovered, ak);
        }
    }
}

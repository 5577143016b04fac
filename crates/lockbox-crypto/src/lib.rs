//! # Lockbox Crypto
//!
//! The crypto engine: per-field record encryption and access-key wrapping.
//!
//! ## Key Model
//!
//! 1. **Access key**: a symmetric key per (writer, record type). Every field of
//!    every record of that type is sealed under a per-field data key, which is
//!    in turn sealed under the access key.
//! 2. **Wrapped key**: the access key sealed for one reader with static-static
//!    X25519. A writer wraps its own access key for itself to persist it, and
//!    for other readers to share it.
//!
//! The engine holds no state. All text outputs are base64url without padding.
//!
//! ## Usage
//!
//! ```rust
//! use lockbox_crypto::{decrypt_record, encrypt_record, generate_access_key};
//! use lockbox_core::FieldMap;
//!
//! let ak = generate_access_key();
//! let mut fields = FieldMap::new();
//! fields.insert("name".into(), "Jon".into());
//!
//! let sealed = encrypt_record(&ak, &fields).unwrap();
//! assert_eq!(decrypt_record(&ak, &sealed).unwrap(), fields);
//! ```

pub mod error;
pub mod keys;
pub mod keyshare;
pub mod record;

pub use error::{CryptoError, Result};
pub use keys::{
    generate_access_key, public_key_of, AccessKey, KeyPair, Nonce, SymmetricKey, NONCE_SIZE,
};
pub use keyshare::{unwrap_key, wrap_key, WrapFormat, WrappedKey};
pub use record::{decrypt_field, decrypt_record, encrypt_field, encrypt_record};

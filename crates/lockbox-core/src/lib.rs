//! # Lockbox Core
//!
//! Pure types for the Lockbox encrypted record store: identities, records,
//! key material containers, and client configuration.
//!
//! This crate contains no cryptography and no networking. It defines the
//! vocabulary the other crates speak.
//!
//! ## Key Types
//!
//! - [`ClientId`], [`RecordId`], [`Version`] - UUID identifiers
//! - [`RecordType`] - The type tag that scopes access keys
//! - [`Meta`] / [`Record`] - A record envelope and its field data
//! - [`PublicKey`] / [`PrivateKey`] - Curve25519 key containers
//! - [`Config`] - An identity's immutable credentials and keypair
//!
//! ## Encoding
//!
//! Anything that crosses a process boundary as key material or ciphertext is
//! URL-safe base64 without padding. See [`encoding`].

pub mod config;
pub mod encoding;
pub mod error;
pub mod keys;
pub mod record;
pub mod types;

pub use config::Config;
pub use error::{CoreError, Result};
pub use keys::{PrivateKey, PublicKey, KEY_SIZE};
pub use record::{ClientInfo, FieldMap, Meta, MetaDraft, Record};
pub use types::{ClientId, RecordId, RecordType, ResourceKind, Version};

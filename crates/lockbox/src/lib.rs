//! # Lockbox
//!
//! Client library for an end-to-end encrypted record store.
//!
//! ## Overview
//!
//! Records are encrypted field by field before they leave the process and
//! decrypted after they come back. The remote service stores ciphertext,
//! plaintext metadata and wrapped keys; it never sees a field value or an
//! unwrapped key.
//!
//! ## Key Concepts
//!
//! - **Access key**: one symmetric key per (writer, record type)
//! - **Wrapped access key**: an access key sealed for one reader
//! - **Share / revoke**: add or delete a reader's wrapped access key
//! - **Version**: optimistic-concurrency token checked on update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lockbox::{Client, Config, FieldMap};
//!
//! async fn example() -> lockbox::Result<()> {
//!     let client = Client::http(Config::from_env()?)?;
//!
//!     let mut data = FieldMap::new();
//!     data.insert("name".into(), "Jon Snow".into());
//!
//!     let record = client.write("contact", data, FieldMap::new()).await?;
//!     let again = client.read(record.record_id()).await?;
//!     assert_eq!(again.data(), record.data());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `lockbox::core` - ids, records, keys and configuration
//! - `lockbox::crypto` - field encryption and key wrapping
//! - `lockbox::store` - the connection contract and in-memory service
//! - `lockbox::http` - the HTTP connection

pub mod cache;
pub mod client;
pub mod error;
mod keyring;
pub mod query;

// Re-export component crates
pub use lockbox_core as core;
pub use lockbox_crypto as crypto;
pub use lockbox_http as http;
pub use lockbox_store as store;

// Re-export main types for convenience
pub use cache::AccessKeyCache;
pub use client::{Client, ClientOptions};
pub use error::{ClientError, Result};
pub use query::{Query, QueryIter};

pub use lockbox_core::{
    ClientId, ClientInfo, Config, FieldMap, Meta, PrivateKey, PublicKey, Record, RecordId,
    RecordType, ResourceKind, Version,
};
pub use lockbox_crypto::KeyPair;
pub use lockbox_http::{HttpConnection, HttpOptions};
pub use lockbox_store::{Connection, Cursor, MemoryConnection, MemoryService};

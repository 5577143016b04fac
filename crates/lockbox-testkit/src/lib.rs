//! # Lockbox Testkit
//!
//! Testing utilities for Lockbox.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: an in-memory network with registered identities and clients
//! - **Generators**: Proptest strategies for keys, record types and field maps
//!
//! ## Test Fixtures
//!
//! ```rust
//! use lockbox_testkit::fixtures::{fields, TestNetwork};
//!
//! # async fn example() {
//! let network = TestNetwork::new();
//! let (_alice, client) = network.register_client("alice");
//! let record = client
//!     .write("contact", fields(&[("name", "Jon")]), Default::default())
//!     .await
//!     .unwrap();
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use lockbox_testkit::generators::{access_key, field_map};
//!
//! proptest! {
//!     #[test]
//!     fn decrypt_inverts_encrypt(key in access_key(), data in field_map(8)) {
//!         let sealed = lockbox_crypto::encrypt_record(&key, &data).unwrap();
//!         prop_assert_eq!(lockbox_crypto::decrypt_record(&key, &sealed).unwrap(), data);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{fields, multi_party_network, TestIdentity, TestNetwork};

//! # Lockbox Store
//!
//! The contract between the Lockbox client and the remote record store, plus
//! an in-memory implementation of that contract.
//!
//! ## Key Types
//!
//! - [`Connection`] - The async trait for every remote operation
//! - [`MemoryService`] - In-process service holding clients, records and access keys
//! - [`MemoryConnection`] - A [`Connection`] to a [`MemoryService`], authenticated as one client
//! - [`QueryFilter`], [`Cursor`], [`QueryPage`] - Paginated query types
//!
//! ## Usage
//!
//! ```rust
//! use lockbox_core::PublicKey;
//! use lockbox_store::{Connection, MemoryService};
//!
//! # async fn example() {
//! let service = MemoryService::new();
//! let token = service.issue_token();
//! let info = service
//!     .register(&token, "alice", &PublicKey::from_bytes([7; 32]))
//!     .unwrap();
//!
//! let conn = service.connect(info.client_id).unwrap();
//! assert_eq!(conn.client_id(), info.client_id);
//! # }
//! ```
//!
//! ## Design Notes
//!
//! - **Cryptographic access control**: the service hands ciphertext to anyone
//!   who asks; only holders of the access key can read it.
//! - **Idempotent deletes**: deleting a missing record or access key succeeds.
//! - **Optimistic concurrency**: updates carry the version they were read at.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{ConnectionError, Result};
pub use memory::{MemoryConnection, MemoryService};
pub use traits::{
    Connection, Cursor, EncryptedAccessKey, QueryFilter, QueryPage, DEFAULT_PAGE_SIZE,
};

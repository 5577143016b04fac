//! # Lockbox HTTP
//!
//! A [`Connection`](lockbox_store::Connection) that speaks the remote record
//! store's JSON REST API.
//!
//! ```rust,no_run
//! use lockbox_core::Config;
//! use lockbox_http::HttpConnection;
//!
//! let config = Config::from_env().unwrap();
//! let conn = HttpConnection::new(config).unwrap();
//! ```
//!
//! Status mapping: `404` is `NotFound`, `409` on a safe update is
//! `Conflict`, `401`/`403` after one re-authentication is `Unauthorized`,
//! other failures are `Service`. Network errors are `Transport`.

mod connection;
mod options;
mod wire;

pub use connection::HttpConnection;
pub use options::HttpOptions;

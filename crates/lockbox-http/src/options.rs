//! Transport tuning.

use std::time::Duration;

/// Options for [`HttpConnection`](crate::HttpConnection).
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-request timeout.
    pub timeout: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("lockbox-rust/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

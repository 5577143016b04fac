//! Connection trait: the interface to the remote record store.
//!
//! The client facade is transport-agnostic. Implementations include the
//! in-memory service (tests, local development) and HTTP (`lockbox-http`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lockbox_core::{
    ClientId, ClientInfo, FieldMap, Meta, MetaDraft, PublicKey, Record, RecordId, RecordType,
    Version,
};

use crate::error::Result;

/// Default number of records per query page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// A wrapped access key as stored by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAccessKey {
    /// Transport-safe wrapped key.
    pub blob: String,

    /// Who wrapped it (the record writer).
    pub authorizer_id: ClientId,

    /// The public key the service reports for the authorizer. Not trusted
    /// for unwrapping; use the key of the expected writer instead.
    pub authorizer_public_key: PublicKey,
}

/// Filters for a record query.
///
/// Empty lists mean "no restriction" on that attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Return record data, not just metadata.
    pub include_data: bool,

    /// Also return records of other writers that shared with us.
    pub include_all_writers: bool,

    pub writer_ids: Vec<ClientId>,
    pub record_ids: Vec<RecordId>,
    pub record_types: Vec<RecordType>,

    /// Maximum records per page.
    pub page_size: usize,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            include_data: false,
            include_all_writers: false,
            writer_ids: Vec::new(),
            record_ids: Vec::new(),
            record_types: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryFilter {
    /// Whether a record's metadata passes the id/writer/type filters.
    pub fn matches(&self, meta: &Meta) -> bool {
        (self.writer_ids.is_empty() || self.writer_ids.contains(&meta.writer_id))
            && (self.record_ids.is_empty() || self.record_ids.contains(&meta.record_id))
            && (self.record_types.is_empty() || self.record_types.contains(&meta.record_type))
    }
}

/// Opaque position in a query's result order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub u64);

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Records in service order. Data is ciphertext, or empty when the
    /// query did not ask for data.
    pub records: Vec<Record>,

    /// Position after the last record of this page. `None` when the page
    /// is empty.
    pub next: Option<Cursor>,
}

/// The remote store contract.
///
/// Every call is a single request; implementations never retry. All key
/// material passed through here is already wrapped and transport-safe.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The identity this connection is authenticated as.
    fn client_id(&self) -> ClientId;

    // ─────────────────────────────────────────────────────────────────────────
    // Clients
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new client using a one-time registration token.
    async fn register_client(
        &self,
        token: &str,
        name: &str,
        public_key: &PublicKey,
    ) -> Result<ClientInfo>;

    /// Look up a client. `NotFound` if unknown.
    async fn get_client_info(&self, client_id: ClientId) -> Result<ClientInfo>;

    /// Look up a client's public key. `NotFound` if unknown.
    async fn get_client_key(&self, client_id: ClientId) -> Result<PublicKey>;

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a new record. Returns the completed metadata.
    async fn put_record(&self, meta: &MetaDraft, data: &FieldMap) -> Result<Meta>;

    /// Fetch a record with ciphertext data. `NotFound` if absent.
    async fn get_record(&self, record_id: RecordId) -> Result<Record>;

    /// Replace a record's plain metadata and data if its version still
    /// matches `expected`. `Conflict` otherwise, with nothing changed.
    async fn update_record(
        &self,
        record_id: RecordId,
        expected: Version,
        plain: &FieldMap,
        data: &FieldMap,
    ) -> Result<Meta>;

    /// Delete a record. Succeeds if it does not exist.
    async fn delete_record(&self, record_id: RecordId) -> Result<()>;

    /// Query records, starting after `after`.
    async fn query(&self, filter: &QueryFilter, after: Option<Cursor>) -> Result<QueryPage>;

    // ─────────────────────────────────────────────────────────────────────────
    // Access Keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Store (or replace) a wrapped access key for a reader.
    async fn put_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
        blob: &str,
    ) -> Result<()>;

    /// Fetch the wrapped access key addressed to a reader. `NotFound` if absent.
    async fn get_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<EncryptedAccessKey>;

    /// Delete a wrapped access key. Succeeds if it does not exist.
    async fn delete_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<()>;
}

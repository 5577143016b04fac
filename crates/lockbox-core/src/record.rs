//! Records and their metadata envelope.
//!
//! A [`Record`] pairs a [`Meta`] (identity, provenance, queryable plaintext
//! metadata and version) with a field map. The same type carries both the
//! ciphertext form (as stored) and the plaintext form (after decryption);
//! only the field values differ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::keys::PublicKey;
use crate::types::{ClientId, RecordId, RecordType, Version};

/// Field name to value. Ordered so iteration and serialization are stable.
pub type FieldMap = BTreeMap<String, String>;

/// Non-secret record envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Service-assigned record identifier.
    pub record_id: RecordId,

    /// The identity that wrote the record (and owns its access key).
    pub writer_id: ClientId,

    /// The subject of the data. Defaults to the writer.
    pub user_id: ClientId,

    /// Type tag; with the writer, selects the access key.
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Plaintext, queryable metadata. Never encrypted.
    #[serde(default)]
    pub plain: FieldMap,

    /// When the record was created.
    pub created: DateTime<Utc>,

    /// When the record was last successfully modified.
    pub last_modified: DateTime<Utc>,

    /// Optimistic-concurrency token.
    pub version: Version,
}

/// The caller-supplied part of a new record's metadata.
///
/// The service fills in the id, timestamps and version on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaDraft {
    pub writer_id: ClientId,
    pub user_id: ClientId,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[serde(default)]
    pub plain: FieldMap,
}

impl MetaDraft {
    /// Draft for a record written by `writer_id` about itself.
    pub fn new(writer_id: ClientId, record_type: RecordType) -> Self {
        Self {
            writer_id,
            user_id: writer_id,
            record_type,
            plain: FieldMap::new(),
        }
    }

    /// Set the subject of the record.
    pub fn with_user(mut self, user_id: ClientId) -> Self {
        self.user_id = user_id;
        self
    }

    /// Attach plaintext metadata.
    pub fn with_plain(mut self, plain: FieldMap) -> Self {
        self.plain = plain;
        self
    }
}

/// A record: metadata plus field data.
///
/// The metadata is read-only through this type; the data can be edited in
/// place for a read-modify-update cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    meta: Meta,
    #[serde(default)]
    data: FieldMap,
}

impl Record {
    /// Pair metadata with field data.
    pub fn new(meta: Meta, data: FieldMap) -> Self {
        Self { meta, data }
    }

    /// The record's metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// The record's field data.
    pub fn data(&self) -> &FieldMap {
        &self.data
    }

    /// Mutable access to the field data.
    pub fn data_mut(&mut self) -> &mut FieldMap {
        &mut self.data
    }

    /// Shorthand for `meta().record_id`.
    pub fn record_id(&self) -> RecordId {
        self.meta.record_id
    }

    /// Shorthand for `meta().version`.
    pub fn version(&self) -> Version {
        self.meta.version
    }

    /// Split into metadata and data.
    pub fn into_parts(self) -> (Meta, FieldMap) {
        (self.meta, self.data)
    }
}

/// Public information about a registered client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub public_key: PublicKey,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub validated: bool,
}

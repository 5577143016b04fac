//! Per-client access-key cache.
//!
//! Access keys are memoized by (writer, record type) for the lifetime of one
//! [`Client`](crate::Client). The cache is never shared between clients and
//! never evicts. It is not told about revocations: a reader that already
//! holds a key keeps it until the entry is invalidated or the client dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lockbox_core::{ClientId, RecordType};
use lockbox_crypto::AccessKey;

type CacheKey = (ClientId, RecordType);

/// Memoized access keys for one client instance.
#[derive(Default)]
pub struct AccessKeyCache {
    entries: Mutex<HashMap<CacheKey, AccessKey>>,
}

impl AccessKeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, AccessKey>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached key for (writer, type), if any.
    pub fn get(&self, writer_id: ClientId, record_type: &RecordType) -> Option<AccessKey> {
        self.entries()
            .get(&(writer_id, record_type.clone()))
            .cloned()
    }

    /// Store a key, replacing any previous entry.
    pub fn insert(&self, writer_id: ClientId, record_type: &RecordType, key: AccessKey) {
        self.entries().insert((writer_id, record_type.clone()), key);
    }

    /// Return the cached key, or run `resolve` and cache its result.
    ///
    /// A failing resolver caches nothing. The lock is not held while the
    /// resolver runs, so two concurrent misses may both resolve; the later
    /// insert wins.
    pub async fn get_or_resolve<F, Fut, E>(
        &self,
        writer_id: ClientId,
        record_type: &RecordType,
        resolve: F,
    ) -> Result<AccessKey, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessKey, E>>,
    {
        if let Some(key) = self.get(writer_id, record_type) {
            return Ok(key);
        }

        let key = resolve().await?;
        self.insert(writer_id, record_type, key.clone());
        Ok(key)
    }

    /// Drop the entry for (writer, type). Returns whether one existed.
    pub fn invalidate(&self, writer_id: ClientId, record_type: &RecordType) -> bool {
        self.entries()
            .remove(&(writer_id, record_type.clone()))
            .is_some()
    }

    /// Whether a key is cached for (writer, type).
    pub fn contains(&self, writer_id: ClientId, record_type: &RecordType) -> bool {
        self.entries()
            .contains_key(&(writer_id, record_type.clone()))
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl std::fmt::Debug for AccessKeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeyCache")
            .field("len", &self.len())
            .finish()
    }
}

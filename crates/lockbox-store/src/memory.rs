//! In-memory implementation of the remote store.
//!
//! A [`MemoryService`] models the observable contract of the remote service:
//! registration by token, per-client authentication, insertion-ordered
//! paginated queries, optimistic concurrency and idempotent deletes. Each
//! client talks to it through its own [`MemoryConnection`]. Nothing is
//! persisted; all data is lost when the service is dropped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use lockbox_core::{
    ClientId, ClientInfo, FieldMap, Meta, MetaDraft, PublicKey, Record, RecordId, RecordType,
    ResourceKind, Version,
};

use crate::error::{ConnectionError, Result};
use crate::traits::{Connection, Cursor, EncryptedAccessKey, QueryFilter, QueryPage};

type EakAddress = (ClientId, ClientId, RecordType);

/// Shared in-memory record service. Thread-safe via RwLock.
pub struct MemoryService {
    inner: RwLock<ServiceState>,
}

#[derive(Default)]
struct ServiceState {
    /// Unused registration tokens.
    tokens: HashSet<String>,

    /// Registered clients.
    clients: HashMap<ClientId, ClientInfo>,

    /// Records by insertion index.
    records: BTreeMap<u64, Record>,

    /// Record id -> insertion index.
    positions: HashMap<RecordId, u64>,

    /// Next insertion index. Starts at 1 so cursor 0 means "before everything".
    next_index: u64,

    /// Wrapped access keys by (writer, reader, type).
    eaks: HashMap<EakAddress, String>,
}

impl MemoryService {
    /// Create a new empty service.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Issue a one-time registration token.
    pub fn issue_token(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.write().tokens.insert(token.clone());
        token
    }

    /// Register a client, consuming a token.
    pub fn register(&self, token: &str, name: &str, public_key: &PublicKey) -> Result<ClientInfo> {
        let mut inner = self.write();

        if !inner.tokens.remove(token) {
            return Err(ConnectionError::Unauthorized(
                "invalid registration token".into(),
            ));
        }

        let info = ClientInfo {
            client_id: ClientId::generate(),
            public_key: *public_key,
            name: Some(name.to_string()),
            validated: true,
        };
        inner.clients.insert(info.client_id, info.clone());

        debug!(client_id = %info.client_id, "registered client");
        Ok(info)
    }

    /// Open a connection authenticated as `client_id`.
    pub fn connect(self: &Arc<Self>, client_id: ClientId) -> Result<MemoryConnection> {
        if !self.read().clients.contains_key(&client_id) {
            return Err(ConnectionError::not_found(ResourceKind::Client, client_id));
        }

        Ok(MemoryConnection {
            client_id,
            service: Arc::clone(self),
        })
    }

    /// Number of live records.
    pub fn record_count(&self) -> usize {
        self.read().records.len()
    }

    /// Number of stored wrapped access keys.
    pub fn eak_count(&self) -> usize {
        self.read().eaks.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ServiceState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ServiceState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self {
            inner: RwLock::new(ServiceState {
                next_index: 1,
                ..ServiceState::default()
            }),
        }
    }
}

impl ServiceState {
    fn record_mut(&mut self, record_id: RecordId) -> Result<&mut Record> {
        let index = self
            .positions
            .get(&record_id)
            .copied()
            .ok_or_else(|| ConnectionError::not_found(ResourceKind::Record, record_id))?;
        self.records
            .get_mut(&index)
            .ok_or_else(|| ConnectionError::not_found(ResourceKind::Record, record_id))
    }

    /// Whether `reader` may see a record from `meta` in queries.
    fn visible(&self, reader: ClientId, meta: &Meta, all_writers: bool) -> bool {
        meta.writer_id == reader
            || (all_writers
                && self
                    .eaks
                    .contains_key(&(meta.writer_id, reader, meta.record_type.clone())))
    }
}

/// A connection to a [`MemoryService`], authenticated as one client.
#[derive(Clone)]
pub struct MemoryConnection {
    client_id: ClientId,
    service: Arc<MemoryService>,
}

impl MemoryConnection {
    /// The service this connection talks to.
    pub fn service(&self) -> &Arc<MemoryService> {
        &self.service
    }

    fn require_self(&self, who: ClientId, action: &str) -> Result<()> {
        if who == self.client_id {
            Ok(())
        } else {
            Err(ConnectionError::Unauthorized(format!(
                "client {} may not {action} on behalf of {who}",
                self.client_id
            )))
        }
    }
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn eak_id(writer_id: ClientId, reader_id: ClientId, record_type: &RecordType) -> String {
    format!("{writer_id}/{reader_id}/{record_type}")
}

#[async_trait]
impl Connection for MemoryConnection {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Clients
    // ─────────────────────────────────────────────────────────────────────────

    async fn register_client(
        &self,
        token: &str,
        name: &str,
        public_key: &PublicKey,
    ) -> Result<ClientInfo> {
        self.service.register(token, name, public_key)
    }

    async fn get_client_info(&self, client_id: ClientId) -> Result<ClientInfo> {
        self.service
            .read()
            .clients
            .get(&client_id)
            .cloned()
            .ok_or_else(|| ConnectionError::not_found(ResourceKind::Client, client_id))
    }

    async fn get_client_key(&self, client_id: ClientId) -> Result<PublicKey> {
        self.get_client_info(client_id).await.map(|info| info.public_key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    async fn put_record(&self, draft: &MetaDraft, data: &FieldMap) -> Result<Meta> {
        self.require_self(draft.writer_id, "write records")?;

        let now = Utc::now();
        let meta = Meta {
            record_id: RecordId::generate(),
            writer_id: draft.writer_id,
            user_id: draft.user_id,
            record_type: draft.record_type.clone(),
            plain: draft.plain.clone(),
            created: now,
            last_modified: now,
            version: Version::generate(),
        };

        let mut inner = self.service.write();
        let index = inner.next_index;
        inner.next_index += 1;
        inner.positions.insert(meta.record_id, index);
        inner
            .records
            .insert(index, Record::new(meta.clone(), data.clone()));

        debug!(record_id = %meta.record_id, record_type = %meta.record_type, "stored record");
        Ok(meta)
    }

    async fn get_record(&self, record_id: RecordId) -> Result<Record> {
        let inner = self.service.read();
        inner
            .positions
            .get(&record_id)
            .and_then(|index| inner.records.get(index))
            .cloned()
            .ok_or_else(|| ConnectionError::not_found(ResourceKind::Record, record_id))
    }

    async fn update_record(
        &self,
        record_id: RecordId,
        expected: Version,
        plain: &FieldMap,
        data: &FieldMap,
    ) -> Result<Meta> {
        let mut inner = self.service.write();
        let record = inner.record_mut(record_id)?;
        self.require_self(record.meta().writer_id, "update records")?;

        if record.version() != expected {
            warn!(%record_id, %expected, current = %record.version(), "stale update rejected");
            return Err(ConnectionError::Conflict {
                record_id,
                expected,
            });
        }

        let mut meta = record.meta().clone();
        meta.plain = plain.clone();
        meta.last_modified = Utc::now().max(meta.created);
        meta.version = Version::generate();
        *record = Record::new(meta.clone(), data.clone());

        debug!(%record_id, version = %meta.version, "updated record");
        Ok(meta)
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<()> {
        let mut inner = self.service.write();

        let Some(&index) = inner.positions.get(&record_id) else {
            return Ok(());
        };
        if let Some(record) = inner.records.get(&index) {
            self.require_self(record.meta().writer_id, "delete records")?;
        }

        inner.positions.remove(&record_id);
        inner.records.remove(&index);

        debug!(%record_id, "deleted record");
        Ok(())
    }

    async fn query(&self, filter: &QueryFilter, after: Option<Cursor>) -> Result<QueryPage> {
        let inner = self.service.read();
        let page_size = filter.page_size.max(1);
        let start = after.map_or(Bound::Unbounded, |c| Bound::Excluded(c.0));

        let mut records = Vec::new();
        let mut last = None;

        for (&index, record) in inner.records.range((start, Bound::Unbounded)) {
            let meta = record.meta();
            if !filter.matches(meta)
                || !inner.visible(self.client_id, meta, filter.include_all_writers)
            {
                continue;
            }

            let record = if filter.include_data {
                record.clone()
            } else {
                Record::new(meta.clone(), FieldMap::new())
            };
            records.push(record);
            last = Some(Cursor(index));

            if records.len() == page_size {
                break;
            }
        }

        Ok(QueryPage {
            records,
            next: last,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Keys
    // ─────────────────────────────────────────────────────────────────────────

    async fn put_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
        blob: &str,
    ) -> Result<()> {
        self.require_self(writer_id, "share access keys")?;

        let mut inner = self.service.write();
        if !inner.clients.contains_key(&reader_id) {
            return Err(ConnectionError::not_found(ResourceKind::Client, reader_id));
        }
        inner
            .eaks
            .insert((writer_id, reader_id, record_type.clone()), blob.to_string());

        debug!(%writer_id, %reader_id, %record_type, "stored access key");
        Ok(())
    }

    async fn get_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<EncryptedAccessKey> {
        self.require_self(reader_id, "read access keys")?;

        let inner = self.service.read();
        let not_found = || {
            ConnectionError::not_found(
                ResourceKind::AccessKey,
                eak_id(writer_id, reader_id, record_type),
            )
        };

        let blob = inner
            .eaks
            .get(&(writer_id, reader_id, record_type.clone()))
            .ok_or_else(not_found)?;
        let writer = inner.clients.get(&writer_id).ok_or_else(not_found)?;

        Ok(EncryptedAccessKey {
            blob: blob.clone(),
            authorizer_id: writer_id,
            authorizer_public_key: writer.public_key,
        })
    }

    async fn delete_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<()> {
        self.require_self(writer_id, "revoke access keys")?;

        let removed = self
            .service
            .write()
            .eaks
            .remove(&(writer_id, reader_id, record_type.clone()))
            .is_some();

        if removed {
            debug!(%writer_id, %reader_id, %record_type, "deleted access key");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(service: &Arc<MemoryService>, name: &str) -> MemoryConnection {
        let token = service.issue_token();
        let info = service
            .register(&token, name, &PublicKey::from_bytes([name.len() as u8; 32]))
            .unwrap();
        service.connect(info.client_id).unwrap()
    }

    fn record_type(name: &str) -> RecordType {
        RecordType::new(name).unwrap()
    }

    fn data(value: &str) -> FieldMap {
        FieldMap::from([("field".to_string(), value.to_string())])
    }

    async fn put(conn: &MemoryConnection, ty: &str, value: &str) -> Meta {
        let draft = MetaDraft::new(conn.client_id(), record_type(ty));
        conn.put_record(&draft, &data(value)).await.unwrap()
    }

    #[tokio::test]
    async fn test_registration_consumes_token() {
        let service = MemoryService::new();
        let token = service.issue_token();
        let pk = PublicKey::from_bytes([1; 32]);

        assert!(service.register(&token, "a", &pk).is_ok());
        assert!(matches!(
            service.register(&token, "b", &pk),
            Err(ConnectionError::Unauthorized(_))
        ));
        assert!(service.register("bogus", "c", &pk).is_err());
    }

    #[tokio::test]
    async fn test_connect_unknown_client() {
        let service = MemoryService::new();
        let err = service.connect(ClientId::generate()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_client_lookup() {
        let service = MemoryService::new();
        let alice = register(&service, "alice");

        let info = alice.get_client_info(alice.client_id()).await.unwrap();
        assert_eq!(info.name.as_deref(), Some("alice"));

        let missing = alice.get_client_key(ClientId::generate()).await.unwrap_err();
        assert!(matches!(
            missing,
            ConnectionError::NotFound {
                kind: ResourceKind::Client,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_record_lifecycle() {
        let service = MemoryService::new();
        let conn = register(&service, "alice");

        let meta = put(&conn, "note", "one").await;
        let fetched = conn.get_record(meta.record_id).await.unwrap();
        assert_eq!(fetched.meta(), &meta);
        assert_eq!(fetched.data(), &data("one"));

        let updated = conn
            .update_record(meta.record_id, meta.version, &FieldMap::new(), &data("two"))
            .await
            .unwrap();
        assert_ne!(updated.version, meta.version);
        assert!(updated.last_modified >= meta.created);

        conn.delete_record(meta.record_id).await.unwrap();
        assert!(conn.get_record(meta.record_id).await.unwrap_err().is_not_found());
        assert_eq!(service.record_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let service = MemoryService::new();
        let conn = register(&service, "alice");
        let meta = put(&conn, "note", "one").await;

        conn.update_record(meta.record_id, meta.version, &FieldMap::new(), &data("two"))
            .await
            .unwrap();

        let err = conn
            .update_record(meta.record_id, meta.version, &FieldMap::new(), &data("three"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::Conflict { .. }));

        let current = conn.get_record(meta.record_id).await.unwrap();
        assert_eq!(current.data(), &data("two"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let service = MemoryService::new();
        let conn = register(&service, "alice");
        conn.delete_record(RecordId::generate()).await.unwrap();
    }

    #[tokio::test]
    async fn test_only_writer_mutates() {
        let service = MemoryService::new();
        let alice = register(&service, "alice");
        let bob = register(&service, "bob");
        let meta = put(&alice, "note", "one").await;

        let update = bob
            .update_record(meta.record_id, meta.version, &FieldMap::new(), &data("x"))
            .await;
        assert!(matches!(update, Err(ConnectionError::Unauthorized(_))));
        assert!(matches!(
            bob.delete_record(meta.record_id).await,
            Err(ConnectionError::Unauthorized(_))
        ));

        let forged = MetaDraft::new(alice.client_id(), record_type("note"));
        assert!(bob.put_record(&forged, &data("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_query_pages_in_insertion_order() {
        let service = MemoryService::new();
        let conn = register(&service, "alice");
        for i in 0..7 {
            put(&conn, "note", &i.to_string()).await;
        }

        let filter = QueryFilter {
            include_data: true,
            page_size: 3,
            ..QueryFilter::default()
        };

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = conn.query(&filter, cursor).await.unwrap();
            seen.extend(page.records.iter().map(|r| r.data()["field"].clone()));
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let expected: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_query_cursor_points_past_final_page() {
        let service = MemoryService::new();
        let conn = register(&service, "alice");
        for i in 0..4 {
            put(&conn, "note", &i.to_string()).await;
        }

        let filter = QueryFilter {
            page_size: 3,
            ..QueryFilter::default()
        };

        let first = conn.query(&filter, None).await.unwrap();
        let last = conn.query(&filter, first.next).await.unwrap();
        assert_eq!(last.records.len(), 1);
        assert!(last.next.is_some());

        let empty = conn.query(&filter, last.next).await.unwrap();
        assert!(empty.records.is_empty());
        assert!(empty.next.is_none());
    }

    #[tokio::test]
    async fn test_query_without_data_strips_fields() {
        let service = MemoryService::new();
        let conn = register(&service, "alice");
        put(&conn, "note", "secret").await;

        let page = conn.query(&QueryFilter::default(), None).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.records[0].data().is_empty());
    }

    #[tokio::test]
    async fn test_query_other_writers_requires_share() {
        let service = MemoryService::new();
        let alice = register(&service, "alice");
        let bob = register(&service, "bob");
        put(&alice, "note", "a").await;
        put(&alice, "diary", "b").await;

        let all = QueryFilter {
            include_all_writers: true,
            ..QueryFilter::default()
        };
        assert!(bob.query(&all, None).await.unwrap().records.is_empty());

        alice
            .put_eak(alice.client_id(), bob.client_id(), &record_type("note"), "blob")
            .await
            .unwrap();

        let page = bob.query(&all, None).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].meta().record_type, record_type("note"));

        let own_only = QueryFilter::default();
        assert!(bob.query(&own_only, None).await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_eak_lifecycle() {
        let service = MemoryService::new();
        let alice = register(&service, "alice");
        let bob = register(&service, "bob");
        let ty = record_type("note");

        alice
            .put_eak(alice.client_id(), bob.client_id(), &ty, "blob-1")
            .await
            .unwrap();
        alice
            .put_eak(alice.client_id(), bob.client_id(), &ty, "blob-2")
            .await
            .unwrap();
        assert_eq!(service.eak_count(), 1);

        let eak = bob
            .get_eak(alice.client_id(), bob.client_id(), &ty)
            .await
            .unwrap();
        assert_eq!(eak.blob, "blob-2");
        assert_eq!(eak.authorizer_id, alice.client_id());
        assert_eq!(
            eak.authorizer_public_key,
            alice.get_client_key(alice.client_id()).await.unwrap()
        );

        alice
            .delete_eak(alice.client_id(), bob.client_id(), &ty)
            .await
            .unwrap();
        alice
            .delete_eak(alice.client_id(), bob.client_id(), &ty)
            .await
            .unwrap();

        let err = bob
            .get_eak(alice.client_id(), bob.client_id(), &ty)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::NotFound {
                kind: ResourceKind::AccessKey,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_eak_addressed_to_unknown_reader() {
        let service = MemoryService::new();
        let alice = register(&service, "alice");

        let err = alice
            .put_eak(alice.client_id(), ClientId::generate(), &record_type("t"), "b")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

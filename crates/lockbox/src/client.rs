//! The Client: encrypted record operations for one identity.
//!
//! Fields are encrypted before they are handed to the [`Connection`] and
//! decrypted after they come back. The connection only ever sees
//! ciphertext, plaintext metadata and wrapped keys.

use std::sync::Arc;

use tracing::debug;

use lockbox_core::{
    ClientId, ClientInfo, Config, FieldMap, MetaDraft, PublicKey, Record, RecordId, RecordType,
};
use lockbox_crypto::{encrypt_record, wrap_key};
use lockbox_http::HttpConnection;
use lockbox_store::{Connection, DEFAULT_PAGE_SIZE};

use crate::cache::AccessKeyCache;
use crate::error::{ClientError, Result};
use crate::keyring::Keyring;
use crate::query::Query;

/// Tuning for a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Records per query page. Zero is treated as one.
    pub page_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// An end-to-end encrypted record store client.
///
/// The identity and connection are fixed at construction. Each client owns
/// its own access-key cache; two clients never share cached keys, even for
/// the same identity.
pub struct Client<C: Connection> {
    keyring: Arc<Keyring<C>>,
    options: ClientOptions,
}

impl Client<HttpConnection> {
    /// Create a client that talks to `config.api_url()` over HTTPS.
    pub fn http(config: Config) -> Result<Self> {
        let connection = HttpConnection::new(config.clone())?;
        Ok(Self::new(config, connection))
    }
}

impl<C: Connection> Client<C> {
    /// Create a client with default options.
    pub fn new(config: Config, connection: C) -> Self {
        Self::with_options(config, connection, ClientOptions::default())
    }

    /// Create a client with explicit options.
    pub fn with_options(config: Config, connection: C, options: ClientOptions) -> Self {
        Self::from_shared(config, Arc::new(connection), options)
    }

    /// Create a client over a connection that is shared with other code.
    pub fn from_shared(config: Config, connection: Arc<C>, options: ClientOptions) -> Self {
        Self {
            keyring: Arc::new(Keyring::new(config, connection)),
            options,
        }
    }

    /// The identity this client acts as.
    pub fn config(&self) -> &Config {
        &self.keyring.config
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.keyring.connection
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// This client's access-key cache.
    pub fn cache(&self) -> &AccessKeyCache {
        &self.keyring.cache
    }

    /// Always fails: the configuration is fixed at construction.
    pub fn try_set_config(&mut self, _config: Config) -> Result<()> {
        Err(ClientError::Immutable { field: "config" })
    }

    /// Always fails: the connection is fixed at construction.
    pub fn try_set_connection(&mut self, _connection: C) -> Result<()> {
        Err(ClientError::Immutable {
            field: "connection",
        })
    }

    fn me(&self) -> ClientId {
        self.keyring.config.client_id()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Clients
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new client identity with a one-time token.
    pub async fn register_client(
        &self,
        token: &str,
        name: &str,
        public_key: &PublicKey,
    ) -> Result<ClientInfo> {
        Ok(self
            .keyring
            .connection
            .register_client(token, name, public_key)
            .await?)
    }

    /// Public information about a client.
    pub async fn client_info(&self, client_id: ClientId) -> Result<ClientInfo> {
        Ok(self.keyring.connection.get_client_info(client_id).await?)
    }

    /// A client's public key.
    pub async fn client_key(&self, client_id: ClientId) -> Result<PublicKey> {
        Ok(self.keyring.connection.get_client_key(client_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt and store a new record.
    ///
    /// `plain` is stored unencrypted and can be used for filtering. The
    /// returned record carries the original plaintext data.
    pub async fn write(&self, record_type: &str, data: FieldMap, plain: FieldMap) -> Result<Record> {
        let record_type = RecordType::new(record_type)?;
        let me = self.me();

        let key = self.keyring.access_key(me, &record_type, true).await?;
        let encrypted = encrypt_record(&key, &data)?;

        let draft = MetaDraft::new(me, record_type).with_plain(plain);
        let meta = self.keyring.connection.put_record(&draft, &encrypted).await?;

        debug!(record_id = %meta.record_id, record_type = %meta.record_type, "wrote record");
        Ok(Record::new(meta, data))
    }

    /// Fetch and decrypt a record.
    pub async fn read(&self, record_id: RecordId) -> Result<Record> {
        let record = self.read_raw(record_id).await?;
        self.keyring.decrypt(record).await
    }

    /// Fetch a record without decrypting it.
    pub async fn read_raw(&self, record_id: RecordId) -> Result<Record> {
        Ok(self.keyring.connection.get_record(record_id).await?)
    }

    /// Start a query over the records visible to this client.
    ///
    /// Nothing is fetched until the resulting iterator is advanced.
    pub fn query(&self) -> Query<C> {
        Query::new(Arc::clone(&self.keyring), self.options.page_size)
    }

    /// Store a record's current data and plain metadata.
    ///
    /// Succeeds only if the record still has the version it was read with;
    /// otherwise fails with [`ClientError::Conflict`] and changes nothing.
    /// The returned record has the new version and modification time.
    pub async fn update(&self, record: &Record) -> Result<Record> {
        let meta = record.meta();
        let create = meta.writer_id == self.me();

        let key = self
            .keyring
            .access_key(meta.writer_id, &meta.record_type, create)
            .await?;
        let encrypted = encrypt_record(&key, record.data())?;

        let updated = self
            .keyring
            .connection
            .update_record(meta.record_id, meta.version, &meta.plain, &encrypted)
            .await?;

        debug!(record_id = %updated.record_id, version = %updated.version, "updated record");
        Ok(Record::new(updated, record.data().clone()))
    }

    /// Delete a record. Deleting a record that does not exist succeeds.
    ///
    /// Access keys for the record's type are left alone.
    pub async fn delete(&self, record_id: RecordId) -> Result<()> {
        self.keyring.connection.delete_record(record_id).await?;
        debug!(%record_id, "deleted record");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sharing
    // ─────────────────────────────────────────────────────────────────────────

    /// Let `reader_id` read every record of `record_type` written by us.
    ///
    /// Sharing again, or sharing with ourselves, succeeds without effect.
    pub async fn share(&self, record_type: &str, reader_id: ClientId) -> Result<()> {
        let record_type = RecordType::new(record_type)?;
        let me = self.me();
        if reader_id == me {
            return Ok(());
        }

        let key = self.keyring.access_key(me, &record_type, true).await?;
        let reader_key = self.client_key(reader_id).await?;
        let blob = wrap_key(&key, self.keyring.config.private_key(), &reader_key)?;

        self.keyring
            .connection
            .put_eak(me, reader_id, &record_type, &blob)
            .await?;

        debug!(%reader_id, %record_type, "shared access key");
        Ok(())
    }

    /// Stop sharing `record_type` with `reader_id`.
    ///
    /// Readers that already hold the key in memory keep it. Revoking a share
    /// that does not exist succeeds. Revoking ourselves is rejected, since
    /// that would orphan every record of the type.
    pub async fn revoke(&self, record_type: &str, reader_id: ClientId) -> Result<()> {
        let record_type = RecordType::new(record_type)?;
        let me = self.me();
        if reader_id == me {
            return Err(ClientError::InvalidOperation(format!(
                "cannot revoke own access to {record_type}"
            )));
        }

        self.keyring
            .connection
            .delete_eak(me, reader_id, &record_type)
            .await?;

        debug!(%reader_id, %record_type, "revoked access key");
        Ok(())
    }

    /// Forget the cached access key for (writer, type).
    ///
    /// The next operation that needs it fetches and unwraps it again.
    pub fn invalidate_access_key(&self, writer_id: ClientId, record_type: &str) -> Result<bool> {
        let record_type = RecordType::new(record_type)?;
        Ok(self.keyring.cache.invalidate(writer_id, &record_type))
    }
}

impl<C: Connection> std::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.me())
            .field("options", &self.options)
            .field("cache", &self.keyring.cache)
            .finish_non_exhaustive()
    }
}

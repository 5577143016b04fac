//! Access-key resolution shared by the client and its query iterators.

use std::sync::Arc;

use tracing::{debug, warn};

use lockbox_core::{ClientId, Config, Record, RecordType};
use lockbox_crypto::{
    decrypt_record, generate_access_key, unwrap_key, wrap_key, AccessKey, CryptoError,
};
use lockbox_store::{Connection, EncryptedAccessKey};

use crate::cache::AccessKeyCache;
use crate::error::Result;

/// Identity, transport and key cache of one client instance.
pub(crate) struct Keyring<C> {
    pub(crate) config: Config,
    pub(crate) connection: Arc<C>,
    pub(crate) cache: AccessKeyCache,
}

impl<C: Connection> Keyring<C> {
    pub(crate) fn new(config: Config, connection: Arc<C>) -> Self {
        Self {
            config,
            connection,
            cache: AccessKeyCache::new(),
        }
    }

    /// Resolve the access key for (writer, type).
    ///
    /// Checks the cache, then the wrapped key addressed to us. When `create`
    /// is set and we are the writer, a missing key is generated and stored
    /// wrapped to ourselves so later instances can find it.
    pub(crate) async fn access_key(
        &self,
        writer_id: ClientId,
        record_type: &RecordType,
        create: bool,
    ) -> Result<AccessKey> {
        let me = self.config.client_id();

        self.cache
            .get_or_resolve(writer_id, record_type, || async move {
                match self.connection.get_eak(writer_id, me, record_type).await {
                    Ok(eak) => self.open_eak(writer_id, &eak).await,
                    Err(e) if e.is_not_found() && create && writer_id == me => {
                        self.create_own_key(record_type).await
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }

    /// Unwrap an access key written by `writer_id`.
    ///
    /// The authorizer key sent along with the blob is never used: the
    /// sender key comes from our own config or from the writer's registered
    /// client key.
    async fn open_eak(&self, writer_id: ClientId, eak: &EncryptedAccessKey) -> Result<AccessKey> {
        if eak.authorizer_id != writer_id {
            warn!(%writer_id, authorizer_id = %eak.authorizer_id, "access key authorizer mismatch");
            return Err(CryptoError::Authentication.into());
        }

        let sender_public = if writer_id == self.config.client_id() {
            *self.config.public_key()
        } else {
            self.connection.get_client_key(writer_id).await?
        };

        Ok(unwrap_key(
            &eak.blob,
            &sender_public,
            self.config.private_key(),
        )?)
    }

    async fn create_own_key(&self, record_type: &RecordType) -> Result<AccessKey> {
        let me = self.config.client_id();
        let key = generate_access_key();
        let blob = wrap_key(&key, self.config.private_key(), self.config.public_key())?;
        self.connection.put_eak(me, me, record_type, &blob).await?;

        debug!(%record_type, "created access key");
        Ok(key)
    }

    /// Decrypt a record fetched from the service.
    pub(crate) async fn decrypt(&self, record: Record) -> Result<Record> {
        let (meta, data) = record.into_parts();
        let key = self
            .access_key(meta.writer_id, &meta.record_type, false)
            .await?;
        let data = decrypt_record(&key, &data)?;
        Ok(Record::new(meta, data))
    }
}

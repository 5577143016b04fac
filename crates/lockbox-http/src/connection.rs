//! HTTP client for the remote record store.
//!
//! Authenticates with client credentials, keeps the bearer token, and
//! re-authenticates once on `401`. Each operation is a single request with
//! no retry or backoff.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use lockbox_core::{
    ClientId, ClientInfo, Config, FieldMap, Meta, MetaDraft, PublicKey, Record, RecordId,
    RecordType, ResourceKind, Version,
};
use lockbox_store::{
    Connection, ConnectionError, Cursor, EncryptedAccessKey, QueryFilter, QueryPage, Result,
};

use crate::options::HttpOptions;
use crate::wire::*;

/// A [`Connection`] over the service's REST API.
pub struct HttpConnection {
    client: Client,
    config: Config,
    token: Mutex<Option<String>>,
}

fn transport(e: reqwest::Error) -> ConnectionError {
    if e.is_decode() {
        ConnectionError::Serialization(e.to_string())
    } else {
        ConnectionError::Transport(e.to_string())
    }
}

/// Map a non-success status onto a connection error.
async fn check(resp: Response, kind: ResourceKind, id: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ConnectionError::not_found(kind, id),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ConnectionError::Unauthorized(format!("{status}: {message}"))
        }
        _ => ConnectionError::Service {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json().await.map_err(transport)
}

impl HttpConnection {
    /// Create a connection for the identity in `config`.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_options(config, HttpOptions::default())
    }

    /// Create a connection with explicit transport options.
    pub fn with_options(config: Config, options: HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    /// The configuration this connection authenticates with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let invalid = |reason: String| {
            ConnectionError::Transport(format!("invalid api url {}: {reason}", self.config.api_url()))
        };

        let mut url = Url::parse(self.config.api_url()).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Exchange the API credentials for a bearer token.
    async fn authenticate(&self) -> Result<String> {
        let resp = self
            .client
            .post(self.url(&["v1", "auth", "token"])?)
            .basic_auth(self.config.api_key_id(), Some(self.config.api_secret()))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(transport)?;

        let resp = check(resp, ResourceKind::Client, &self.config.client_id().to_string()).await?;
        let token: TokenResponse = decode(resp).await?;

        *self.token.lock().await = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    async fn current_token(&self) -> Result<String> {
        let cached = self.token.lock().await.clone();
        match cached {
            Some(token) => Ok(token),
            None => self.authenticate().await,
        }
    }

    /// Send an authenticated request, re-authenticating once on 401.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let token = self.current_token().await?;
        let resp = build(&token).send().await.map_err(transport)?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!("401 from service, re-authenticating");
        let token = self.authenticate().await?;
        build(&token).send().await.map_err(transport)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, kind: ResourceKind, id: &str) -> Result<T> {
        let resp = self
            .send(|token| self.client.get(url.clone()).bearer_auth(token))
            .await?;
        decode(check(resp, kind, id).await?).await
    }

    fn eak_url(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<Url> {
        let writer = writer_id.to_string();
        self.url(&[
            "v1",
            "storage",
            "access_keys",
            &writer,
            &writer,
            &reader_id.to_string(),
            record_type.as_str(),
        ])
    }
}

impl std::fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection")
            .field("client_id", &self.config.client_id())
            .field("api_url", &self.config.api_url())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for HttpConnection {
    fn client_id(&self) -> ClientId {
        self.config.client_id()
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
        let body = RegisterRequest {
            token,
            client: RegisterClient {
                name,
                public_key: WirePublicKey {
                    curve25519: *public_key,
                },
            },
        };

        let resp = self
            .client
            .post(self.url(&["v1", "account", "e3db", "clients", "register"])?)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let client: WireClient = decode(check(resp, ResourceKind::Client, name).await?).await?;
        debug!(client_id = %client.client_id, "registered client");
        Ok(client.into())
    }

    async fn get_client_info(&self, client_id: ClientId) -> Result<ClientInfo> {
        let id = client_id.to_string();
        let url = self.url(&["v1", "storage", "clients", &id])?;
        let client: WireClient = self.get(url, ResourceKind::Client, &id).await?;
        Ok(client.into())
    }

    async fn get_client_key(&self, client_id: ClientId) -> Result<PublicKey> {
        self.get_client_info(client_id)
            .await
            .map(|info| info.public_key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    async fn put_record(&self, meta: &MetaDraft, data: &FieldMap) -> Result<Meta> {
        let url = self.url(&["v1", "storage", "records"])?;
        let body = WriteRequest { meta, data };

        let resp = self
            .send(|token| self.client.post(url.clone()).bearer_auth(token).json(&body))
            .await?;
        let record: WireRecord =
            decode(check(resp, ResourceKind::Record, "new").await?).await?;

        debug!(record_id = %record.meta.record_id, "stored record");
        Ok(record.meta)
    }

    async fn get_record(&self, record_id: RecordId) -> Result<Record> {
        let id = record_id.to_string();
        let url = self.url(&["v1", "storage", "records", &id])?;
        let record: WireRecord = self.get(url, ResourceKind::Record, &id).await?;
        Ok(Record::new(record.meta, record.data))
    }

    async fn update_record(
        &self,
        record_id: RecordId,
        expected: Version,
        plain: &FieldMap,
        data: &FieldMap,
    ) -> Result<Meta> {
        let url = self.url(&[
            "v1",
            "storage",
            "records",
            "safe",
            &record_id.to_string(),
            &expected.to_string(),
        ])?;
        let body = WriteRequest {
            meta: PlainOnly { plain },
            data,
        };

        let resp = self
            .send(|token| self.client.put(url.clone()).bearer_auth(token).json(&body))
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            debug!(%record_id, %expected, "stale update rejected");
            return Err(ConnectionError::Conflict {
                record_id,
                expected,
            });
        }

        let record: WireRecord =
            decode(check(resp, ResourceKind::Record, &record_id.to_string()).await?).await?;
        Ok(record.meta)
    }

    async fn delete_record(&self, record_id: RecordId) -> Result<()> {
        let url = self.url(&["v1", "storage", "records", &record_id.to_string()])?;
        let resp = self
            .send(|token| self.client.delete(url.clone()).bearer_auth(token))
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(resp, ResourceKind::Record, &record_id.to_string()).await?;
        Ok(())
    }

    async fn query(&self, filter: &QueryFilter, after: Option<Cursor>) -> Result<QueryPage> {
        let url = self.url(&["v1", "storage", "search"])?;
        let body = SearchRequest {
            count: filter.page_size,
            include_data: filter.include_data,
            include_all_writers: filter.include_all_writers,
            writer_ids: &filter.writer_ids,
            record_ids: &filter.record_ids,
            content_types: &filter.record_types,
            after_index: after.map(|c| c.0),
        };

        let resp = self
            .send(|token| self.client.post(url.clone()).bearer_auth(token).json(&body))
            .await?;
        let page: SearchResponse =
            decode(check(resp, ResourceKind::Record, "search").await?).await?;

        let next = (!page.results.is_empty()).then_some(Cursor(page.last_index));
        let records = page
            .results
            .into_iter()
            .map(|r| Record::new(r.meta, r.record_data.unwrap_or_default()))
            .collect();

        Ok(QueryPage { records, next })
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
        let url = self.eak_url(writer_id, reader_id, record_type)?;
        let body = PutEak { eak: blob };

        let resp = self
            .send(|token| self.client.put(url.clone()).bearer_auth(token).json(&body))
            .await?;
        check(resp, ResourceKind::Client, &reader_id.to_string()).await?;

        debug!(%writer_id, %reader_id, %record_type, "stored access key");
        Ok(())
    }

    async fn get_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<EncryptedAccessKey> {
        let url = self.eak_url(writer_id, reader_id, record_type)?;
        let id = format!("{writer_id}/{reader_id}/{record_type}");
        let eak: WireEak = self.get(url, ResourceKind::AccessKey, &id).await?;

        Ok(EncryptedAccessKey {
            blob: eak.eak,
            authorizer_id: eak.authorizer_id,
            authorizer_public_key: eak.authorizer_public_key.curve25519,
        })
    }

    async fn delete_eak(
        &self,
        writer_id: ClientId,
        reader_id: ClientId,
        record_type: &RecordType,
    ) -> Result<()> {
        let url = self.eak_url(writer_id, reader_id, record_type)?;
        let resp = self
            .send(|token| self.client.delete(url.clone()).bearer_auth(token))
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check(resp, ResourceKind::AccessKey, &reader_id.to_string()).await?;
        Ok(())
    }
}

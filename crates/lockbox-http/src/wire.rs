//! JSON bodies exchanged with the REST API.

use serde::{Deserialize, Serialize};

use lockbox_core::{ClientId, ClientInfo, FieldMap, Meta, PublicKey, RecordId, RecordType};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WirePublicKey {
    pub curve25519: PublicKey,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub token: &'a str,
    pub client: RegisterClient<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterClient<'a> {
    pub name: &'a str,
    pub public_key: WirePublicKey,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireClient {
    pub client_id: ClientId,
    pub public_key: WirePublicKey,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub validated: bool,
}

impl From<WireClient> for ClientInfo {
    fn from(c: WireClient) -> Self {
        ClientInfo {
            client_id: c.client_id,
            public_key: c.public_key.curve25519,
            name: c.name,
            validated: c.validated,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WriteRequest<'a, M: Serialize> {
    pub meta: M,
    pub data: &'a FieldMap,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlainOnly<'a> {
    pub plain: &'a FieldMap,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRecord {
    pub meta: Meta,
    #[serde(default)]
    pub data: FieldMap,
}

#[derive(Debug, Serialize)]
pub(crate) struct PutEak<'a> {
    pub eak: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireEak {
    pub eak: String,
    pub authorizer_id: ClientId,
    pub authorizer_public_key: WirePublicKey,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub count: usize,
    pub include_data: bool,
    pub include_all_writers: bool,
    pub writer_ids: &'a [ClientId],
    pub record_ids: &'a [RecordId],
    pub content_types: &'a [RecordType],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_index: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub last_index: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    pub meta: Meta,
    #[serde(default)]
    pub record_data: Option<FieldMap>,
}

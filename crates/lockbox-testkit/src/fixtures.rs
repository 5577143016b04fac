//! Test fixtures and helpers.
//!
//! A [`TestNetwork`] is one in-memory service plus the identities registered
//! with it. Clients built from the same identity share the service but never
//! share an access-key cache.

use std::sync::Arc;

use lockbox::{Client, ClientOptions};
use lockbox_core::{ClientId, Config, FieldMap};
use lockbox_crypto::KeyPair;
use lockbox_store::{MemoryConnection, MemoryService};

/// API URL recorded in fixture configs. Never contacted.
pub const TEST_API_URL: &str = "memory://lockbox.test";

/// An in-memory service with helpers to register identities and build clients.
pub struct TestNetwork {
    pub service: Arc<MemoryService>,
}

/// A registered identity.
#[derive(Debug, Clone)]
pub struct TestIdentity {
    pub name: String,
    pub config: Config,
}

impl TestIdentity {
    pub fn client_id(&self) -> ClientId {
        self.config.client_id()
    }
}

impl TestNetwork {
    /// Create a network with an empty service.
    pub fn new() -> Self {
        Self {
            service: MemoryService::new(),
        }
    }

    /// Register a new identity with a fresh keypair.
    pub fn register(&self, name: &str) -> TestIdentity {
        let keypair = KeyPair::generate();
        let token = self.service.issue_token();
        let info = self
            .service
            .register(&token, name, &keypair.public)
            .expect("fresh token registers");

        TestIdentity {
            name: name.to_string(),
            config: Config::new(
                info.client_id,
                format!("{name}-key"),
                format!("{name}-secret"),
                keypair.public,
                keypair.private,
                TEST_API_URL,
            ),
        }
    }

    /// Build a new client instance for an identity, with its own empty cache.
    pub fn client(&self, identity: &TestIdentity) -> Client<MemoryConnection> {
        self.client_with_options(identity, ClientOptions::default())
    }

    /// Build a client with explicit options.
    pub fn client_with_options(
        &self,
        identity: &TestIdentity,
        options: ClientOptions,
    ) -> Client<MemoryConnection> {
        let connection = self
            .service
            .connect(identity.client_id())
            .expect("identity is registered");
        Client::with_options(identity.config.clone(), connection, options)
    }

    /// Register an identity and build a client for it.
    pub fn register_client(&self, name: &str) -> (TestIdentity, Client<MemoryConnection>) {
        let identity = self.register(name);
        let client = self.client(&identity);
        (identity, client)
    }
}

impl Default for TestNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a field map from string pairs.
pub fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A network with `n` registered identities named `party-0`, `party-1`, ...
pub fn multi_party_network(n: usize) -> (TestNetwork, Vec<TestIdentity>) {
    let network = TestNetwork::new();
    let identities = (0..n)
        .map(|i| network.register(&format!("party-{i}")))
        .collect();
    (network, identities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clients_share_service_not_cache() {
        let network = TestNetwork::new();
        let (alice, first) = network.register_client("alice");
        let second = network.client(&alice);

        first
            .write("note", fields(&[("body", "hi")]), FieldMap::new())
            .await
            .unwrap();

        assert_eq!(network.service.record_count(), 1);
        assert_eq!(first.cache().len(), 1);
        assert!(second.cache().is_empty());
    }

    #[test]
    fn test_multi_party_identities_are_distinct() {
        let (_, parties) = multi_party_network(3);
        assert_eq!(parties.len(), 3);
        assert_ne!(parties[0].client_id(), parties[1].client_id());
        assert_ne!(parties[0].config.public_key(), parties[2].config.public_key());
    }
}

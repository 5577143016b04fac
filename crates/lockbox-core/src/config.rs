//! Client identity configuration.
//!
//! A [`Config`] is the credential bundle of one identity: its client id, API
//! key pair, Curve25519 keypair and the service endpoint. It is fixed at
//! construction. There are no setters and no generic field lookup; callers
//! that need free-form metadata use [`Meta::plain`](crate::Meta::plain).
//!
//! Configs can be built directly, read from the environment, or loaded from a
//! JSON profile:
//!
//! ```json
//! {
//!   "client_id": "b0c7...",
//!   "api_key_id": "...",
//!   "api_secret": "...",
//!   "public_key": "<base64url>",
//!   "private_key": "<base64url>",
//!   "api_url": "https://api.example.com"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::keys::{PrivateKey, PublicKey};
use crate::types::ClientId;

/// Environment variable names read by [`Config::from_env`].
pub mod env {
    pub const CLIENT_ID: &str = "CLIENT_ID";
    pub const API_KEY_ID: &str = "API_KEY_ID";
    pub const API_SECRET: &str = "API_SECRET";
    pub const PUBLIC_KEY: &str = "PUBLIC_KEY";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const API_URL: &str = "API_URL";
}

/// Immutable identity and credentials for one client.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    client_id: ClientId,
    api_key_id: String,
    api_secret: String,
    public_key: PublicKey,
    private_key: PrivateKey,
    api_url: String,
}

impl Config {
    /// Create a configuration. A trailing `/` on the URL is dropped.
    pub fn new(
        client_id: ClientId,
        api_key_id: impl Into<String>,
        api_secret: impl Into<String>,
        public_key: PublicKey,
        private_key: PrivateKey,
        api_url: impl Into<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client_id,
            api_key_id: api_key_id.into(),
            api_secret: api_secret.into(),
            public_key,
            private_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Read the configuration from process environment variables.
    ///
    /// See [`env`] for the variable names.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a name-to-value lookup.
    ///
    /// Used by [`Config::from_env`]; also lets callers source values from
    /// somewhere other than the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::Config(format!("missing {name}")))
        };

        let client_id = get(env::CLIENT_ID)?.parse()?;
        let public_key = PublicKey::from_base64(&get(env::PUBLIC_KEY)?)?;
        let private_key = PrivateKey::from_base64(&get(env::PRIVATE_KEY)?)?;

        Ok(Self::new(
            client_id,
            get(env::API_KEY_ID)?,
            get(env::API_SECRET)?,
            public_key,
            private_key,
            get(env::API_URL)?,
        ))
    }

    /// Parse a JSON profile.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.api_url.is_empty() {
            return Err(CoreError::Config("api_url must not be empty".into()));
        }
        Ok(Self::new(
            config.client_id,
            config.api_key_id,
            config.api_secret,
            config.public_key,
            config.private_key,
            config.api_url,
        ))
    }

    /// Load a JSON profile from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write this configuration as a JSON profile.
    ///
    /// On Unix the file is created with mode `0600`, since it holds the
    /// private key and API secret.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let path = path.as_ref();
        std::fs::write(path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn api_key_id(&self) -> &str {
        &self.api_key_id
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("api_key_id", &self.api_key_id)
            .field("api_secret", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("private_key", &self.private_key)
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample() -> Config {
        Config::new(
            ClientId::generate(),
            "key-id",
            "very-secret",
            PublicKey::from_bytes([1; 32]),
            PrivateKey::from_bytes([2; 32]),
            "https://api.example.com/",
        )
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        assert_eq!(sample().api_url(), "https://api.example.com");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("key-id"));
    }

    #[test]
    fn test_from_lookup() {
        let config = sample();
        let mut vars = HashMap::new();
        vars.insert(env::CLIENT_ID, config.client_id().to_string());
        vars.insert(env::API_KEY_ID, "key-id".to_string());
        vars.insert(env::API_SECRET, "very-secret".to_string());
        vars.insert(env::PUBLIC_KEY, config.public_key().to_base64());
        vars.insert(env::PRIVATE_KEY, config.private_key().to_base64());
        vars.insert(env::API_URL, "https://api.example.com".to_string());

        let loaded = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
        assert_eq!(loaded.client_id(), config.client_id());
        assert_eq!(loaded.public_key(), config.public_key());
        assert_eq!(loaded.private_key().as_bytes(), config.private_key().as_bytes());
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        match err {
            CoreError::Config(msg) => assert!(msg.contains(env::CLIENT_ID)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_save_and_load_profile() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("profile.json");

        let config = sample();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.client_id(), config.client_id());
        assert_eq!(loaded.api_secret(), "very-secret");
        assert_eq!(loaded.api_url(), "https://api.example.com");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_profile_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        sample().save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_from_json_rejects_bad_key() {
        let json = r#"{
            "client_id": "00000000-0000-0000-0000-000000000000",
            "api_key_id": "k",
            "api_secret": "s",
            "public_key": "short",
            "private_key": "short",
            "api_url": "https://api.example.com"
        }"#;
        assert!(matches!(
            Config::from_json(json),
            Err(CoreError::Serialization(_))
        ));
    }
}

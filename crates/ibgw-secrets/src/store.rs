//! Secret store client.
//!
//! Production deployments keep brokerage credentials in a Vault KV-v2
//! mount; the pool only ever reads one path per tenant. Stored pairs
//! come in two field-name conventions depending on which tool wrote
//! them, so the decoder tries each shape in order instead of probing
//! for attribute presence.

use crate::error::{SecretsError, SecretsResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for store requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Username/password pair as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretPair {
    pub username: String,
    pub password: String,
}

/// Accepted on-disk shapes for a stored pair, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredPair {
    /// `{"username": ..., "password": ...}`
    UserPass { username: String, password: String },
    /// `{"login": ..., "secret": ...}` (legacy provisioning tool)
    LoginSecret { login: String, secret: String },
}

impl From<StoredPair> for SecretPair {
    fn from(raw: StoredPair) -> Self {
        match raw {
            StoredPair::UserPass { username, password } => Self { username, password },
            StoredPair::LoginSecret { login, secret } => Self {
                username: login,
                password: secret,
            },
        }
    }
}

/// Read access to the external secret store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the pair at `path`, or `None` if the path does not exist.
    async fn get_secret(&self, path: &str) -> SecretsResult<Option<SecretPair>>;
}

/// Secret store connection settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SecretStoreConfig {
    /// Whether the store is consulted at all.
    #[serde(default)]
    pub enabled: bool,
    /// Store base URL (e.g., "http://127.0.0.1:8200").
    #[serde(default = "default_addr")]
    pub addr: String,
    /// KV-v2 mount name.
    #[serde(default = "default_mount")]
    pub mount: String,
    /// Path namespace prefixed to every tenant's credential_ref.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_addr() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_mount() -> String {
    "secret".to_string()
}

fn default_namespace() -> String {
    "ibkr".to_string()
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_addr(),
            mount: default_mount(),
            namespace: default_namespace(),
        }
    }
}

/// Vault KV-v2 client.
pub struct VaultClient {
    client: reqwest::Client,
    addr: String,
    mount: String,
    token: String,
}

/// KV-v2 read response: the pair is nested under `data.data`.
#[derive(Debug, Deserialize)]
struct KvReadResponse {
    data: KvReadData,
}

#[derive(Debug, Deserialize)]
struct KvReadData {
    data: serde_json::Value,
}

impl VaultClient {
    /// Create a client against the configured store.
    pub fn new(config: &SecretStoreConfig, token: impl Into<String>) -> SecretsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SecretsError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            addr: config.addr.trim_end_matches('/').to_string(),
            mount: config.mount.clone(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn get_secret(&self, path: &str) -> SecretsResult<Option<SecretPair>> {
        let url = format!("{}/v1/{}/data/{}", self.addr, self.mount, path);
        debug!(%url, "Reading secret");

        let response = self
            .client
            .get(&url)
            .header("X-Vault-Token", &self.token)
            .send()
            .await
            .map_err(|e| SecretsError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            debug!(path, "Secret path not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SecretsError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body: KvReadResponse = response
            .json()
            .await
            .map_err(|e| SecretsError::HttpClient(format!("Failed to parse response: {e}")))?;

        match serde_json::from_value::<StoredPair>(body.data.data) {
            Ok(raw) => Ok(Some(raw.into())),
            Err(e) => {
                warn!(path, error = %e, "Secret present but shape not recognized");
                Err(SecretsError::UnrecognizedShape {
                    path: path.to_string(),
                })
            }
        }
    }
}

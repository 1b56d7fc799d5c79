//! Gateway session client.

use crate::error::{ProtocolError, ProtocolResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ibgw_core::TenantId;
use ibgw_secrets::Credentials;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default timeout for gateway bridge requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a tenant's gateway bridge listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEndpoint {
    pub tenant_id: TenantId,
    pub host: String,
    pub port: u16,
    pub client_session_id: u32,
}

impl GatewayEndpoint {
    /// Endpoint on the loopback interface, the only place gateway
    /// ports are ever bound.
    #[must_use]
    pub fn local(tenant_id: TenantId, port: u16, client_session_id: u32) -> Self {
        Self {
            tenant_id,
            host: "127.0.0.1".to_string(),
            port,
            client_session_id,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}/v1", self.host, self.port)
    }
}

/// Live, authenticated session with one tenant's gateway.
///
/// Cloneable so `get_client` can hand copies to trading logic; a clone
/// is only valid until the next reconnect, at which point the pool
/// mints a new handle and status queries stop vouching for old ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub tenant_id: TenantId,
    pub host: String,
    pub port: u16,
    pub client_session_id: u32,
    /// Gateway-assigned session token.
    pub session_token: String,
    pub connected_at: DateTime<Utc>,
}

/// The consumed brokerage protocol interface.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Authenticate against the gateway and open a session.
    async fn connect(
        &self,
        endpoint: &GatewayEndpoint,
        credentials: &Credentials,
    ) -> ProtocolResult<ConnectionHandle>;

    /// Explicit protocol-level liveness query for an open session.
    async fn is_connected(&self, handle: &ConnectionHandle) -> bool;

    /// Close the session. Best-effort; a dead gateway makes this a no-op.
    async fn disconnect(&self, handle: &ConnectionHandle) -> ProtocolResult<()>;
}

#[derive(Debug, Serialize)]
struct SessionRequest<'a> {
    username: &'a str,
    password: &'a str,
    client_id: u32,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session_token: String,
}

#[derive(Debug, Deserialize)]
struct SessionStatus {
    connected: bool,
}

/// REST bridge implementation of `BrokerClient`.
pub struct RestBrokerClient {
    client: reqwest::Client,
}

impl RestBrokerClient {
    pub fn new() -> ProtocolResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProtocolError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BrokerClient for RestBrokerClient {
    async fn connect(
        &self,
        endpoint: &GatewayEndpoint,
        credentials: &Credentials,
    ) -> ProtocolResult<ConnectionHandle> {
        let url = format!("{}/session", endpoint.base_url());
        debug!(tenant = %endpoint.tenant_id, %url, "Opening gateway session");

        let request = SessionRequest {
            username: &credentials.username,
            password: &credentials.password,
            client_id: endpoint.client_session_id,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProtocolError::Unreachable {
                host: endpoint.host.clone(),
                port: endpoint.port,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProtocolError::AuthRejected {
                status: status.as_u16(),
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| ProtocolError::MalformedResponse(e.to_string()))?;

        Ok(ConnectionHandle {
            tenant_id: endpoint.tenant_id.clone(),
            host: endpoint.host.clone(),
            port: endpoint.port,
            client_session_id: endpoint.client_session_id,
            session_token: session.session_token,
            connected_at: Utc::now(),
        })
    }

    async fn is_connected(&self, handle: &ConnectionHandle) -> bool {
        let url = format!(
            "http://{}:{}/v1/session/{}/status",
            handle.host, handle.port, handle.session_token
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(tenant = %handle.tenant_id, error = %e, "Session status query failed");
                return false;
            }
        };

        if !response.status().is_success() {
            return false;
        }

        match response.json::<SessionStatus>().await {
            Ok(status) => status.connected,
            Err(e) => {
                warn!(tenant = %handle.tenant_id, error = %e, "Malformed session status");
                false
            }
        }
    }

    async fn disconnect(&self, handle: &ConnectionHandle) -> ProtocolResult<()> {
        let url = format!(
            "http://{}:{}/v1/session/{}",
            handle.host, handle.port, handle.session_token
        );

        self.client
            .delete(&url)
            .send()
            .await
            .map_err(|e| ProtocolError::Unreachable {
                host: handle.host.clone(),
                port: handle.port,
                reason: e.to_string(),
            })?;

        debug!(tenant = %handle.tenant_id, "Gateway session closed");
        Ok(())
    }
}

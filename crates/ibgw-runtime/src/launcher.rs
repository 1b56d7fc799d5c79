//! Gateway container launcher.

use crate::error::RuntimeResult;
use crate::runtime::{ContainerRef, ContainerRuntime, ContainerSpec};
use ibgw_core::TenantId;
use ibgw_secrets::Credentials;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Gateway image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayImageConfig {
    /// Image to launch for every tenant.
    #[serde(default = "default_image")]
    pub image: String,
    /// Port the gateway's API listens on inside the container.
    #[serde(default = "default_container_port")]
    pub container_port: u16,
}

fn default_image() -> String {
    "ghcr.io/example/ib-gateway:stable".to_string()
}

fn default_container_port() -> u16 {
    5000
}

impl Default for GatewayImageConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            container_port: default_container_port(),
        }
    }
}

/// Composes create + start into a single fire-and-poll launch.
///
/// The launcher does not wait for the gateway to authenticate; the
/// health monitor polls the protocol connection and enforces the
/// startup deadline.
pub struct GatewayLauncher {
    runtime: Arc<dyn ContainerRuntime>,
    config: GatewayImageConfig,
}

impl GatewayLauncher {
    #[must_use]
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: GatewayImageConfig) -> Self {
        Self { runtime, config }
    }

    /// Create and start a gateway container for `tenant`.
    ///
    /// The allocated host port and client session id are injected as
    /// process configuration together with the resolved credentials.
    /// If start fails after create, the half-created container is
    /// removed before the error propagates so no orphan is left behind.
    pub async fn launch(
        &self,
        tenant: &TenantId,
        host_port: u16,
        client_session_id: u32,
        credentials: &Credentials,
    ) -> RuntimeResult<ContainerRef> {
        let spec = ContainerSpec {
            name: container_name(tenant),
            image: self.config.image.clone(),
            env: vec![
                ("IB_USERNAME".to_string(), credentials.username.clone()),
                ("IB_PASSWORD".to_string(), credentials.password.clone()),
                ("IB_CLIENT_ID".to_string(), client_session_id.to_string()),
                ("IB_API_PORT".to_string(), self.config.container_port.to_string()),
            ],
            host_port,
            container_port: self.config.container_port,
            labels: vec![("ibgw.tenant".to_string(), tenant.to_string())],
        };

        let container = self.runtime.create(&spec).await?;

        if let Err(e) = self.runtime.start(&container).await {
            warn!(tenant = %tenant, container = %container.name, error = %e, "Start failed, removing created container");
            if let Err(rm_err) = self.runtime.remove(&container).await {
                warn!(tenant = %tenant, error = %rm_err, "Cleanup of half-created container failed");
            }
            return Err(e);
        }

        info!(
            tenant = %tenant,
            container = %container.name,
            host_port,
            client_session_id,
            "Gateway container launched"
        );
        Ok(container)
    }
}

/// Deterministic container name for a tenant.
fn container_name(tenant: &TenantId) -> String {
    let sanitized: String = tenant
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("ibgw-{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessRuntimeError;
    use crate::runtime::MockContainerRuntime;
    use mockall::predicate::always;

    fn tenant() -> TenantId {
        TenantId::new("f1").unwrap()
    }

    #[test]
    fn test_container_name_sanitized() {
        let t = TenantId::new("acct:7/live").unwrap();
        assert_eq!(container_name(&t), "ibgw-acct-7-live");
    }

    #[tokio::test]
    async fn test_launch_creates_then_starts() {
        let mut runtime = MockContainerRuntime::new();
        runtime
            .expect_create()
            .withf(|spec: &ContainerSpec| {
                spec.name == "ibgw-f1"
                    && spec.host_port == 4100
                    && spec
                        .env
                        .iter()
                        .any(|(k, v)| k == "IB_CLIENT_ID" && v == "1000")
            })
            .returning(|spec| {
                Ok(ContainerRef {
                    id: "abc123".to_string(),
                    name: spec.name.clone(),
                })
            });
        runtime.expect_start().returning(|_| Ok(()));

        let launcher = GatewayLauncher::new(Arc::new(runtime), GatewayImageConfig::default());
        let container = launcher
            .launch(&tenant(), 4100, 1000, &Credentials::new("fred", "hunter2"))
            .await
            .unwrap();
        assert_eq!(container.id, "abc123");
    }

    #[tokio::test]
    async fn test_start_failure_removes_container() {
        let mut runtime = MockContainerRuntime::new();
        runtime.expect_create().returning(|spec| {
            Ok(ContainerRef {
                id: "abc123".to_string(),
                name: spec.name.clone(),
            })
        });
        runtime.expect_start().returning(|_| {
            Err(ProcessRuntimeError::CommandFailed {
                action: "start",
                container: "ibgw-f1".to_string(),
                stderr: "port already in use".to_string(),
            })
        });
        runtime
            .expect_remove()
            .with(always())
            .times(1)
            .returning(|_| Ok(()));

        let launcher = GatewayLauncher::new(Arc::new(runtime), GatewayImageConfig::default());
        let result = launcher
            .launch(&tenant(), 4100, 1000, &Credentials::new("fred", "hunter2"))
            .await;
        assert!(result.is_err());
    }
}

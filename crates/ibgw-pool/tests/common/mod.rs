//! In-memory fakes for pool lifecycle tests.
//!
//! The fake runtime and broker let tests script process death, refused
//! sessions and hanging stops without any real containers, in the
//! spirit of the mock-server integration harness used elsewhere in the
//! workspace.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use ibgw_core::{GatewayStatus, Result as CoreResult, TenantId, TenantRoster, TenantSpec};
use ibgw_pool::{PoolConfig, PoolManager, ReconnectConfig};
use ibgw_protocol::{BrokerClient, ConnectionHandle, GatewayEndpoint, ProtocolError, ProtocolResult};
use ibgw_runtime::{
    ContainerRef, ContainerRuntime, ContainerSpec, ContainerState, GatewayImageConfig,
    GatewayLauncher, ProcessRuntimeError, RuntimeResult,
};
use ibgw_secrets::{CredentialResolver, Credentials, SecretStoreConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a "hanging" container ignores its stop request.
pub const HANG_STOP_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
struct FakeContainer {
    name: String,
    running: bool,
}

/// In-memory container runtime.
#[derive(Default)]
pub struct FakeRuntime {
    containers: DashMap<String, FakeContainer>,
    create_count: AtomicUsize,
    next_id: AtomicUsize,
    hang_stop: Mutex<HashSet<String>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Containers created over the runtime's lifetime.
    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    /// Make `container_name` ignore graceful stops.
    pub fn hang_on_stop(&self, container_name: &str) {
        self.hang_stop.lock().insert(container_name.to_string());
    }

    /// Simulate the gateway process dying out from under the pool.
    pub fn kill(&self, container_name: &str) {
        for mut entry in self.containers.iter_mut() {
            if entry.name == container_name {
                entry.running = false;
            }
        }
    }

    pub fn running_count(&self) -> usize {
        self.containers
            .iter()
            .filter(|entry| entry.running)
            .count()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn create(&self, spec: &ContainerSpec) -> RuntimeResult<ContainerRef> {
        let id = format!("c{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.containers.insert(
            id.clone(),
            FakeContainer {
                name: spec.name.clone(),
                running: false,
            },
        );
        self.create_count.fetch_add(1, Ordering::SeqCst);
        Ok(ContainerRef {
            id,
            name: spec.name.clone(),
        })
    }

    async fn start(&self, container: &ContainerRef) -> RuntimeResult<()> {
        match self.containers.get_mut(&container.id) {
            Some(mut entry) => {
                entry.running = true;
                Ok(())
            }
            None => Err(ProcessRuntimeError::CommandFailed {
                action: "start",
                container: container.name.clone(),
                stderr: "No such container".to_string(),
            }),
        }
    }

    async fn inspect(&self, container: &ContainerRef) -> RuntimeResult<ContainerState> {
        match self.containers.get(&container.id) {
            Some(entry) => Ok(ContainerState {
                running: entry.running,
            }),
            None => Err(ProcessRuntimeError::CommandFailed {
                action: "inspect",
                container: container.name.clone(),
                stderr: "No such container".to_string(),
            }),
        }
    }

    async fn stop(&self, container: &ContainerRef, _timeout: Duration) -> RuntimeResult<()> {
        let hangs = self.hang_stop.lock().contains(&container.name);
        if hangs {
            tokio::time::sleep(HANG_STOP_DURATION).await;
        }
        if let Some(mut entry) = self.containers.get_mut(&container.id) {
            entry.running = false;
        }
        Ok(())
    }

    async fn remove(&self, container: &ContainerRef) -> RuntimeResult<()> {
        self.containers.remove(&container.id);
        Ok(())
    }
}

/// Scripted brokerage protocol client.
#[derive(Default)]
pub struct FakeBroker {
    /// Connect outcome when a tenant has no script queued.
    default_connect: AtomicBool,
    /// Per-tenant queue of scripted connect outcomes, consumed first.
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    /// Per-tenant `is_connected` answer.
    connected: DashMap<String, bool>,
    connect_calls: DashMap<String, usize>,
    token_seq: AtomicUsize,
}

impl FakeBroker {
    pub fn new() -> Self {
        let broker = Self::default();
        broker.default_connect.store(true, Ordering::SeqCst);
        broker
    }

    pub fn set_default_connect(&self, ok: bool) {
        self.default_connect.store(ok, Ordering::SeqCst);
    }

    /// Queue connect outcomes for a tenant, consumed before the default.
    pub fn push_connect_script(&self, tenant: &str, outcomes: &[bool]) {
        self.scripts
            .lock()
            .entry(tenant.to_string())
            .or_default()
            .extend(outcomes.iter().copied());
    }

    /// Flip the protocol-level liveness answer for a tenant.
    pub fn set_connected(&self, tenant: &str, connected: bool) {
        self.connected.insert(tenant.to_string(), connected);
    }

    pub fn connect_calls(&self, tenant: &str) -> usize {
        self.connect_calls.get(tenant).map(|v| *v).unwrap_or(0)
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn connect(
        &self,
        endpoint: &GatewayEndpoint,
        _credentials: &Credentials,
    ) -> ProtocolResult<ConnectionHandle> {
        let tenant = endpoint.tenant_id.to_string();
        *self.connect_calls.entry(tenant.clone()).or_insert(0) += 1;

        let ok = self
            .scripts
            .lock()
            .get_mut(&tenant)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.default_connect.load(Ordering::SeqCst));

        if !ok {
            return Err(ProtocolError::Unreachable {
                host: endpoint.host.clone(),
                port: endpoint.port,
                reason: "scripted refusal".to_string(),
            });
        }

        self.connected.insert(tenant, true);
        Ok(ConnectionHandle {
            tenant_id: endpoint.tenant_id.clone(),
            host: endpoint.host.clone(),
            port: endpoint.port,
            client_session_id: endpoint.client_session_id,
            session_token: format!("tok-{}", self.token_seq.fetch_add(1, Ordering::SeqCst)),
            connected_at: Utc::now(),
        })
    }

    async fn is_connected(&self, handle: &ConnectionHandle) -> bool {
        self.connected
            .get(handle.tenant_id.as_str())
            .map(|v| *v)
            .unwrap_or(false)
    }

    async fn disconnect(&self, _handle: &ConnectionHandle) -> ProtocolResult<()> {
        Ok(())
    }
}

/// Mutable roster source.
#[derive(Default)]
pub struct FakeRoster {
    tenants: Mutex<Vec<TenantSpec>>,
}

impl FakeRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ids: &[&str]) {
        let specs = ids
            .iter()
            .map(|id| TenantSpec {
                tenant_id: TenantId::new(*id).unwrap(),
                credential_ref: None,
                fallback_identifier: format!("{id}_user"),
            })
            .collect();
        *self.tenants.lock() = specs;
    }
}

#[async_trait]
impl TenantRoster for FakeRoster {
    async fn list_enabled_tenants(&self) -> CoreResult<Vec<TenantSpec>> {
        Ok(self.tenants.lock().clone())
    }
}

/// Pool wired to fakes, with short timeouts suitable for tests.
pub struct Harness {
    pub manager: Arc<PoolManager>,
    pub runtime: Arc<FakeRuntime>,
    pub broker: Arc<FakeBroker>,
    pub roster: Arc<FakeRoster>,
}

pub fn test_config() -> PoolConfig {
    PoolConfig {
        port_range_start: 4100,
        port_range_end: 4149,
        client_id_range_start: 1000,
        client_id_range_end: 1049,
        max_startup_ms: 150,
        healthcheck_interval_ms: 25,
        stop_timeout_ms: 50,
        shutdown_grace_ms: 400,
        reconnect: ReconnectConfig {
            max_attempts: 3,
            base_delay_ms: 10,
            window_ms: 2_000,
        },
    }
}

pub fn harness(config: PoolConfig) -> Harness {
    let runtime = Arc::new(FakeRuntime::new());
    let broker = Arc::new(FakeBroker::new());
    let roster = Arc::new(FakeRoster::new());

    let resolver = CredentialResolver::disabled(&SecretStoreConfig::default());
    let launcher = GatewayLauncher::new(runtime.clone(), GatewayImageConfig::default());

    let manager = PoolManager::new(
        config,
        roster.clone(),
        runtime.clone(),
        broker.clone(),
        resolver,
        launcher,
    )
    .expect("pool manager construction");

    Harness {
        manager: Arc::new(manager),
        runtime,
        broker,
        roster,
    }
}

pub fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

/// Poll until the tenant reaches `status` or the timeout elapses.
pub async fn wait_for_status(
    manager: &PoolManager,
    id: &TenantId,
    status: GatewayStatus,
    timeout: Duration,
) -> bool {
    wait_until(timeout, || {
        manager.status(id).map(|s| s.status) == Some(status)
    })
    .await
}

/// Poll `get_client` until it yields a handle or the timeout elapses.
pub async fn wait_for_client(
    manager: &PoolManager,
    id: &TenantId,
    timeout: Duration,
) -> Option<ConnectionHandle> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(handle) = manager.get_client(id) {
            return Some(handle);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `predicate` holds or the timeout elapses.
pub async fn wait_until(timeout: Duration, predicate: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

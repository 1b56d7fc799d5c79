//! Pool manager facade.

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::health::{HealthMonitor, MonitorTask};
use crate::instance::GatewayInstance;
use crate::registry::GatewayRegistry;
use crate::resources::ResourcePools;
use crate::shutdown::{teardown_instance, ShutdownCoordinator};
use ibgw_core::{StatusSnapshot, TenantId, TenantRoster, TenantSpec};
use ibgw_protocol::{BrokerClient, ConnectionHandle, GatewayEndpoint};
use ibgw_runtime::{ContainerRuntime, GatewayLauncher};
use ibgw_secrets::{CredentialResolver, Resolution};
use ibgw_telemetry::Metrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Time allowed for a cancelled monitor task to exit before it is
/// aborted.
const MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one `reload_tenants` pass.
#[derive(Debug, Default)]
pub struct ReloadSummary {
    /// Tenants onboarded this pass.
    pub started: Vec<TenantId>,
    /// Tenants torn down because they left the roster.
    pub removed: Vec<TenantId>,
    /// Tenants whose onboarding failed, with the error. Never silently
    /// dropped; a failed tenant stays absent until the next reload.
    pub failed: Vec<(TenantId, PoolError)>,
    /// Tenants already live and left untouched.
    pub unchanged: usize,
}

impl ReloadSummary {
    /// True when the roster diff required no work.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.started.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }
}

/// Allocator occupancy, for capacity dashboards.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PoolStats {
    pub instances: usize,
    pub ports_allocated: usize,
    pub ports_available: usize,
    pub client_ids_allocated: usize,
    pub client_ids_available: usize,
}

/// The facade composing allocator, resolver, lifecycle controller,
/// registry, health monitoring and shutdown.
///
/// Trading logic calls `get_client`; operators call `status`/`list`;
/// the daemon calls `start`, `reload_tenants` and `stop`.
pub struct PoolManager {
    config: PoolConfig,
    roster: Arc<dyn TenantRoster>,
    runtime: Arc<dyn ContainerRuntime>,
    resolver: CredentialResolver,
    launcher: GatewayLauncher,
    registry: Arc<GatewayRegistry>,
    pools: Arc<ResourcePools>,
    monitor: Arc<HealthMonitor>,
    coordinator: ShutdownCoordinator,
    tasks: Mutex<HashMap<TenantId, MonitorTask>>,
}

impl PoolManager {
    pub fn new(
        config: PoolConfig,
        roster: Arc<dyn TenantRoster>,
        runtime: Arc<dyn ContainerRuntime>,
        broker: Arc<dyn BrokerClient>,
        resolver: CredentialResolver,
        launcher: GatewayLauncher,
    ) -> PoolResult<Self> {
        let registry = Arc::new(GatewayRegistry::new());
        let pools = Arc::new(ResourcePools::from_config(&config)?);
        let monitor = Arc::new(HealthMonitor::new(
            registry.clone(),
            runtime.clone(),
            broker,
            pools.clone(),
            config.clone(),
        ));
        let coordinator = ShutdownCoordinator::new(
            registry.clone(),
            runtime.clone(),
            pools.clone(),
            config.stop_timeout(),
        );

        Ok(Self {
            config,
            roster,
            runtime,
            resolver,
            launcher,
            registry,
            pools,
            monitor,
            coordinator,
            tasks: Mutex::new(HashMap::new()),
        })
    }

    /// Load the enabled-tenant roster and bring the pool in line with it.
    pub async fn start(&self) -> PoolResult<ReloadSummary> {
        info!("Starting gateway pool");
        self.reload_tenants().await
    }

    /// Diff the roster against the registry: onboard additions, tear
    /// down removals, recreate terminal entries. Idempotent for an
    /// unchanged roster.
    pub async fn reload_tenants(&self) -> PoolResult<ReloadSummary> {
        let roster = self.roster.list_enabled_tenants().await?;
        let desired: HashMap<TenantId, TenantSpec> = roster
            .into_iter()
            .map(|spec| (spec.tenant_id.clone(), spec))
            .collect();

        let mut summary = ReloadSummary::default();

        for tenant in self.registry.tenants() {
            if !desired.contains_key(&tenant) {
                info!(tenant = %tenant, "Tenant left roster, stopping gateway");
                if let Err(e) = self.stop_tenant(&tenant).await {
                    warn!(tenant = %tenant, error = %e, "Tenant teardown reported an error");
                }
                summary.removed.push(tenant);
            }
        }

        for (tenant, spec) in desired {
            if let Some(entry) = self.registry.get(&tenant) {
                if !entry.read().status().is_terminal() {
                    summary.unchanged += 1;
                    continue;
                }

                // Explicit recreation path for STOPPED/FAILED entries:
                // clear remnants, then onboard from scratch.
                info!(tenant = %tenant, "Recreating terminal instance");
                let task = self.tasks.lock().remove(&tenant);
                if let Some(task) = task {
                    task.cancel_and_join(MONITOR_JOIN_TIMEOUT).await;
                }
                let terminal = entry.read().status();
                teardown_instance(
                    &self.runtime,
                    &self.pools,
                    &entry,
                    terminal,
                    self.config.stop_timeout(),
                )
                .await;
                self.registry.remove(&tenant);
            }

            match self.onboard(spec).await {
                Ok(()) => summary.started.push(tenant),
                Err(e) => {
                    error!(tenant = %tenant, error = %e, "Tenant onboarding failed");
                    summary.failed.push((tenant, e));
                }
            }
        }

        info!(
            started = summary.started.len(),
            removed = summary.removed.len(),
            failed = summary.failed.len(),
            unchanged = summary.unchanged,
            "Roster reload complete"
        );
        Ok(summary)
    }

    /// Allocator -> resolver -> launcher -> registry -> monitor, with
    /// partially allocated resources returned on any failure.
    async fn onboard(&self, spec: TenantSpec) -> PoolResult<()> {
        let tenant = spec.tenant_id.clone();

        let host_port = self.pools.ports.allocate()?;
        let client_session_id = match self.pools.client_ids.allocate() {
            Ok(id) => id,
            Err(e) => {
                self.pools.ports.release(host_port).ok();
                return Err(e.into());
            }
        };

        let resolution = self.resolver.resolve(&spec).await;
        if let Resolution::Fallback { reason, .. } = &resolution {
            warn!(tenant = %tenant, reason = %reason, "Credential resolution degraded, downstream auth may fail");
            Metrics::credential_fallback(tenant.as_str(), &reason.to_string());
        }
        let credentials = resolution.into_credentials();

        let container = match self
            .launcher
            .launch(&tenant, host_port, client_session_id, &credentials)
            .await
        {
            Ok(container) => container,
            Err(e) => {
                self.pools.release(host_port, client_session_id);
                return Err(e.into());
            }
        };

        let instance =
            GatewayInstance::new(tenant.clone(), container, host_port, client_session_id);
        self.registry.upsert(instance);

        let endpoint = GatewayEndpoint::local(tenant.clone(), host_port, client_session_id);
        let task = self.monitor.spawn(endpoint, credentials);
        if let Some(old) = self.tasks.lock().insert(tenant, task) {
            old.abort();
        }

        Ok(())
    }

    /// Stop one tenant's gateway and release its resources.
    ///
    /// The monitor is cancelled and joined before the container is
    /// touched or resources released, so a stale check cannot race a
    /// fresh instance created for the same tenant right after.
    pub async fn stop_tenant(&self, tenant: &TenantId) -> PoolResult<()> {
        let Some(entry) = self.registry.get(tenant) else {
            return Err(PoolError::UnknownTenant(tenant.clone()));
        };

        let task = self.tasks.lock().remove(tenant);
        if let Some(task) = task {
            task.cancel_and_join(MONITOR_JOIN_TIMEOUT).await;
        }

        teardown_instance(
            &self.runtime,
            &self.pools,
            &entry,
            ibgw_core::GatewayStatus::Stopped,
            self.config.stop_timeout(),
        )
        .await;

        self.registry.remove(tenant);
        Ok(())
    }

    /// The read path trading logic uses on every call.
    ///
    /// Never blocks waiting for a gateway to boot: returns the current
    /// live handle, or an explicit not-ready error.
    pub fn get_client(&self, tenant: &TenantId) -> PoolResult<ConnectionHandle> {
        self.registry
            .connection(tenant, self.config.heartbeat_freshness())
    }

    /// Read-only status of one tenant.
    #[must_use]
    pub fn status(&self, tenant: &TenantId) -> Option<StatusSnapshot> {
        self.registry.snapshot(tenant)
    }

    /// Read-only status of every instance.
    #[must_use]
    pub fn list(&self) -> Vec<StatusSnapshot> {
        self.registry.list()
    }

    /// Allocator occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            instances: self.registry.len(),
            ports_allocated: self.pools.ports.allocated(),
            ports_available: self.pools.ports.available(),
            client_ids_allocated: self.pools.client_ids.allocated(),
            client_ids_available: self.pools.client_ids.available(),
        }
    }

    /// Stop every instance within the configured grace period.
    pub async fn stop(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        self.coordinator
            .stop_all(tasks, self.config.shutdown_grace())
            .await;
    }
}

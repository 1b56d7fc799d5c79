//! Coordinated teardown.
//!
//! The single-instance teardown path lives here and is shared by the
//! health monitor (startup timeout, reconnect exhaustion), tenant
//! removal, and the global shutdown sweep: cancel the monitor first,
//! stop the container, force-remove stragglers, then release the
//! port/client-id pair. Resource release happens strictly after the
//! process stop/remove calls have completed.

use crate::health::MonitorTask;
use crate::registry::{GatewayRegistry, SharedInstance};
use crate::resources::ResourcePools;
use futures_util::future::join_all;
use ibgw_core::{GatewayStatus, TenantId};
use ibgw_runtime::{ContainerRef, ContainerRuntime};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Upper bound on the force-remove call for a container that ignored
/// its graceful stop.
const FORCE_REMOVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Move an instance to a terminal state, stop and remove its
/// container, and return its resources to the pools.
///
/// Idempotent: a second call on an already-released instance only
/// applies the terminal transition. Partial failures are logged and do
/// not abort the remaining steps; shutdown is total-effort.
pub(crate) async fn teardown_instance(
    runtime: &Arc<dyn ContainerRuntime>,
    pools: &ResourcePools,
    entry: &SharedInstance,
    terminal: GatewayStatus,
    stop_timeout: Duration,
) {
    let (tenant, container, host_port, client_session_id) = {
        let mut instance = entry.write();
        let tenant = instance.tenant_id.clone();
        if instance.status() != terminal {
            if let Err(e) = instance.transition(terminal) {
                warn!(tenant = %tenant, error = %e, "Terminal transition rejected");
            }
        }
        if instance.resources_released {
            return;
        }
        instance.resources_released = true;
        (
            tenant,
            instance.container.take(),
            instance.host_port,
            instance.client_session_id,
        )
    };

    if let Some(container) = container {
        stop_container(runtime, &tenant, &container, stop_timeout).await;
    }

    pools.release(host_port, client_session_id);
    debug!(tenant = %tenant, host_port, client_session_id, "Resources released");
}

/// Graceful stop bounded by `stop_timeout`, then force remove.
async fn stop_container(
    runtime: &Arc<dyn ContainerRuntime>,
    tenant: &TenantId,
    container: &ContainerRef,
    stop_timeout: Duration,
) {
    let graceful = tokio::time::timeout(
        stop_timeout + Duration::from_millis(500),
        runtime.stop(container, stop_timeout),
    )
    .await;

    match graceful {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(tenant = %tenant, container = %container.name, error = %e, "Graceful stop failed, force-removing");
        }
        Err(_) => {
            warn!(tenant = %tenant, container = %container.name, "Graceful stop timed out, force-removing");
        }
    }

    match tokio::time::timeout(FORCE_REMOVE_TIMEOUT, runtime.remove(container)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(tenant = %tenant, container = %container.name, error = %e, "Container removal failed");
        }
        Err(_) => {
            error!(tenant = %tenant, container = %container.name, "Container removal timed out");
        }
    }
}

/// Stops every gateway instance concurrently under a shared deadline.
pub struct ShutdownCoordinator {
    registry: Arc<GatewayRegistry>,
    runtime: Arc<dyn ContainerRuntime>,
    pools: Arc<ResourcePools>,
    stop_timeout: Duration,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new(
        registry: Arc<GatewayRegistry>,
        runtime: Arc<dyn ContainerRuntime>,
        pools: Arc<ResourcePools>,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            runtime,
            pools,
            stop_timeout,
        }
    }

    /// Stop all instances within `grace`, force-terminating stragglers.
    ///
    /// Every monitor is cancelled before its instance's resources are
    /// touched. When the sweep completes the registry is empty and all
    /// port/client-id allocations have been returned.
    pub async fn stop_all(&self, mut tasks: HashMap<TenantId, MonitorTask>, grace: Duration) {
        let deadline = Instant::now() + grace;
        let tenants = self.registry.tenants();
        info!(count = tenants.len(), grace_ms = grace.as_millis() as u64, "Stopping all gateway instances");

        let sweeps = tenants.into_iter().map(|tenant| {
            let task = tasks.remove(&tenant);
            async move {
                if let Some(task) = task {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    task.cancel_and_join(remaining).await;
                }

                let Some(entry) = self.registry.get(&tenant) else {
                    return;
                };

                let remaining = deadline.saturating_duration_since(Instant::now());
                let stop_timeout = self.stop_timeout.min(remaining);
                teardown_instance(
                    &self.runtime,
                    &self.pools,
                    &entry,
                    GatewayStatus::Stopped,
                    stop_timeout,
                )
                .await;
            }
        });

        join_all(sweeps).await;

        // Monitors whose registry entry disappeared mid-shutdown still
        // need cancelling.
        for (tenant, task) in tasks {
            warn!(tenant = %tenant, "Cancelling orphaned monitor task");
            task.abort();
        }

        self.registry.clear();
        info!(
            ports_allocated = self.pools.ports.allocated(),
            client_ids_allocated = self.pools.client_ids.allocated(),
            "Shutdown sweep complete"
        );
    }
}

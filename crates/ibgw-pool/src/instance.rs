//! Per-tenant gateway instance state.

use crate::error::{PoolError, PoolResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use ibgw_core::{GatewayStatus, StatusSnapshot, TenantId};
use ibgw_protocol::ConnectionHandle;
use ibgw_runtime::ContainerRef;
use ibgw_telemetry::Metrics;
use std::time::Duration;
use tracing::debug;

/// State of one tenant's gateway, owned by the registry.
///
/// Mutated only through the registry's locks, by the component that
/// owns each field: the lifecycle path sets the container, the health
/// monitor drives status/connection/heartbeat, teardown performs the
/// terminal transition and marks resources released.
#[derive(Debug)]
pub struct GatewayInstance {
    pub tenant_id: TenantId,
    /// Reference to the launched container; cleared on teardown.
    pub container: Option<ContainerRef>,
    pub host_port: u16,
    pub client_session_id: u32,
    status: GatewayStatus,
    /// Present only while RUNNING.
    pub connection: Option<ConnectionHandle>,
    /// Most recent successful health check.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    /// Reset on any successful health check.
    pub consecutive_failures: u32,
    /// Launch time; startup deadline is measured against this.
    pub started_at: DateTime<Utc>,
    /// Set once the port/client-id pair has been returned to the pools.
    pub resources_released: bool,
}

impl GatewayInstance {
    /// A freshly launched instance in STARTING.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        container: ContainerRef,
        host_port: u16,
        client_session_id: u32,
    ) -> Self {
        Metrics::gateway_entered("starting");
        Self {
            tenant_id,
            container: Some(container),
            host_port,
            client_session_id,
            status: GatewayStatus::Starting,
            connection: None,
            last_heartbeat_at: None,
            consecutive_failures: 0,
            started_at: Utc::now(),
            resources_released: false,
        }
    }

    #[must_use]
    pub fn status(&self) -> GatewayStatus {
        self.status
    }

    /// Apply a state transition, rejecting illegal ones.
    ///
    /// Leaving RUNNING always drops the connection handle, so a stale
    /// handle can never be observed alongside a non-RUNNING status.
    pub fn transition(&mut self, to: GatewayStatus) -> PoolResult<()> {
        if !self.status.can_transition(to) {
            return Err(PoolError::IllegalTransition {
                tenant: self.tenant_id.clone(),
                from: self.status,
                to,
            });
        }
        debug!(tenant = %self.tenant_id, from = %self.status, to = %to, "Status transition");
        Metrics::gateway_left(&self.status.to_string());
        Metrics::gateway_entered(&to.to_string());
        self.status = to;
        if to != GatewayStatus::Running {
            self.connection = None;
        }
        Ok(())
    }

    /// Record a live connection: STARTING -> RUNNING (or a reconnect's
    /// STARTING -> RUNNING), stamp the heartbeat, clear the failure
    /// counter.
    pub fn mark_running(&mut self, connection: ConnectionHandle) -> PoolResult<()> {
        self.transition(GatewayStatus::Running)?;
        self.connection = Some(connection);
        self.last_heartbeat_at = Some(Utc::now());
        self.consecutive_failures = 0;
        Ok(())
    }

    /// Record a successful health check.
    pub fn record_heartbeat(&mut self) {
        self.last_heartbeat_at = Some(Utc::now());
        self.consecutive_failures = 0;
    }

    /// Record a failed health check or reconnect attempt.
    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
    }

    /// Whether the heartbeat is older than the allowed freshness.
    #[must_use]
    pub fn is_stale(&self, freshness: Duration) -> bool {
        let Some(heartbeat) = self.last_heartbeat_at else {
            return true;
        };
        let age = Utc::now() - heartbeat;
        age > ChronoDuration::from_std(freshness).unwrap_or(ChronoDuration::MAX)
    }

    /// Milliseconds since launch.
    #[must_use]
    pub fn startup_elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Read-only projection for the operational surface.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            tenant_id: self.tenant_id.clone(),
            status: self.status,
            host_port: self.host_port,
            client_session_id: self.client_session_id,
            last_heartbeat_at: self.last_heartbeat_at,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

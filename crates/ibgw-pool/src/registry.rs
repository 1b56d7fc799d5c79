//! Gateway registry: single source of truth for instance state.

use crate::error::{PoolError, PoolResult};
use crate::instance::GatewayInstance;
use dashmap::DashMap;
use ibgw_core::{GatewayStatus, StatusSnapshot, TenantId};
use ibgw_protocol::ConnectionHandle;
use ibgw_telemetry::Metrics;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to one instance's state.
pub type SharedInstance = Arc<RwLock<GatewayInstance>>;

/// Concurrency-safe map from tenant to gateway instance.
///
/// All state transitions are written through this component; nothing
/// else caches instance state. Entries guard their own `RwLock`, so
/// the map is only touched for lookup and membership changes and a
/// slow instance never blocks reads of another.
#[derive(Debug, Default)]
pub struct GatewayRegistry {
    inner: DashMap<TenantId, SharedInstance>,
}

impl GatewayRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Look up a tenant's instance.
    #[must_use]
    pub fn get(&self, tenant: &TenantId) -> Option<SharedInstance> {
        self.inner.get(tenant).map(|entry| entry.value().clone())
    }

    /// Insert or replace a tenant's instance.
    pub fn upsert(&self, instance: GatewayInstance) -> SharedInstance {
        let tenant = instance.tenant_id.clone();
        let shared = Arc::new(RwLock::new(instance));
        self.inner.insert(tenant, shared.clone());
        shared
    }

    /// Remove a tenant's entry. Only called after full resource release.
    pub fn remove(&self, tenant: &TenantId) -> Option<SharedInstance> {
        let removed = self.inner.remove(tenant).map(|(_, v)| v);
        if let Some(entry) = &removed {
            Metrics::gateway_left(&entry.read().status().to_string());
        }
        removed
    }

    /// All tenants currently in the map.
    #[must_use]
    pub fn tenants(&self) -> Vec<TenantId> {
        self.inner.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Read-only snapshot of one tenant.
    #[must_use]
    pub fn snapshot(&self, tenant: &TenantId) -> Option<StatusSnapshot> {
        self.get(tenant).map(|entry| entry.read().snapshot())
    }

    /// Read-only snapshots of every instance.
    #[must_use]
    pub fn list(&self) -> Vec<StatusSnapshot> {
        let mut snapshots: Vec<StatusSnapshot> = self
            .inner
            .iter()
            .map(|entry| entry.value().read().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        snapshots
    }

    /// The `get_client` read path.
    ///
    /// Returns the connection handle only if the instance is RUNNING
    /// and its heartbeat is within `freshness`; anything else is an
    /// explicit not-ready result, never a stale handle.
    pub fn connection(
        &self,
        tenant: &TenantId,
        freshness: Duration,
    ) -> PoolResult<ConnectionHandle> {
        let Some(entry) = self.get(tenant) else {
            return Err(PoolError::NotReady {
                tenant: tenant.clone(),
                status: None,
            });
        };

        let instance = entry.read();
        if instance.status() != GatewayStatus::Running || instance.is_stale(freshness) {
            return Err(PoolError::NotReady {
                tenant: tenant.clone(),
                status: Some(instance.status()),
            });
        }

        instance
            .connection
            .clone()
            .ok_or_else(|| PoolError::NotReady {
                tenant: tenant.clone(),
                status: Some(instance.status()),
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every entry. Only the shutdown coordinator calls this,
    /// after all instances have reached a terminal state.
    pub fn clear(&self) {
        for entry in self.inner.iter() {
            Metrics::gateway_left(&entry.value().read().status().to_string());
        }
        self.inner.clear();
    }
}

//! Shared resource pools.

use crate::config::PoolConfig;
use crate::error::PoolResult;
use ibgw_alloc::{ClientIdPool, PortPool};
use tracing::warn;

/// The two finite pools every live instance draws from.
///
/// Each pool carries its own lock; allocating a port never contends
/// with allocating a client id.
#[derive(Debug)]
pub struct ResourcePools {
    pub ports: PortPool,
    pub client_ids: ClientIdPool,
}

impl ResourcePools {
    pub fn from_config(config: &PoolConfig) -> PoolResult<Self> {
        Ok(Self {
            ports: PortPool::new(config.port_range_start, config.port_range_end)?,
            client_ids: ClientIdPool::new(
                config.client_id_range_start,
                config.client_id_range_end,
            )?,
        })
    }

    /// Return a port/client-id pair to the pools.
    ///
    /// Only called after the owning process is confirmed stopped or
    /// removed. Release failures are logged, never propagated: one bad
    /// value must not block the rest of a teardown sweep.
    pub fn release(&self, host_port: u16, client_session_id: u32) {
        if let Err(e) = self.ports.release(host_port) {
            warn!(host_port, error = %e, "Port release failed");
        }
        if let Err(e) = self.client_ids.release(client_session_id) {
            warn!(client_session_id, error = %e, "Client id release failed");
        }
    }
}

//! Gateway instance lifecycle states.
//!
//! The state machine is deliberately small:
//!
//! ```text
//! STARTING ──► RUNNING ──► STARTING (reconnect)
//!    │            │
//!    ▼            ▼
//!  FAILED       FAILED
//!
//! any ──► STOPPED
//! ```
//!
//! STOPPED and FAILED are terminal; a tenant in either state is only
//! brought back by recreating the instance, never by resurrecting it
//! in place.

use crate::types::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a gateway instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayStatus {
    /// Process launched, protocol connection not yet live.
    Starting,
    /// Process alive and protocol connection confirmed.
    Running,
    /// Deliberately stopped; resources released.
    Stopped,
    /// Gave up (startup timeout or reconnect exhaustion); resources released.
    Failed,
}

impl GatewayStatus {
    /// Whether a transition from `self` to `to` is legal.
    #[must_use]
    pub fn can_transition(self, to: GatewayStatus) -> bool {
        use GatewayStatus::{Failed, Running, Starting, Stopped};
        match (self, to) {
            (Starting, Running) | (Starting, Failed) => true,
            (Running, Starting) | (Running, Failed) => true,
            (_, Stopped) => true,
            _ => false,
        }
    }

    /// Terminal states hold no process, connection, or resources.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, GatewayStatus::Stopped | GatewayStatus::Failed)
    }
}

impl fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GatewayStatus::Starting => "starting",
            GatewayStatus::Running => "running",
            GatewayStatus::Stopped => "stopped",
            GatewayStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Read-only projection of one instance for dashboards and health probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub tenant_id: TenantId,
    pub status: GatewayStatus,
    pub host_port: u16,
    pub client_session_id: u32,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

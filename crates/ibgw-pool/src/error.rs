//! Pool error types.

use ibgw_alloc::AllocError;
use ibgw_core::{CoreError, GatewayStatus, TenantId};
use ibgw_protocol::ProtocolError;
use ibgw_runtime::ProcessRuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    /// No free port or client session id. Fatal to the onboarding
    /// attempt; indicates a capacity-planning problem.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(#[from] AllocError),

    /// The gateway did not become live within the startup deadline.
    #[error("Gateway for {tenant} did not become live within {waited_ms}ms")]
    StartupTimeout { tenant: TenantId, waited_ms: u64 },

    /// The health monitor gave up after its backoff budget.
    #[error("Reconnect exhausted for {tenant} after {attempts} attempts")]
    ReconnectExhausted { tenant: TenantId, attempts: u32 },

    /// `get_client` observed no usable connection.
    #[error("Gateway for {tenant} is not ready (status: {status:?})")]
    NotReady {
        tenant: TenantId,
        status: Option<GatewayStatus>,
    },

    /// A state transition outside the legal set was requested.
    #[error("Illegal transition for {tenant}: {from} -> {to}")]
    IllegalTransition {
        tenant: TenantId,
        from: GatewayStatus,
        to: GatewayStatus,
    },

    #[error("Process runtime error: {0}")]
    Runtime(#[from] ProcessRuntimeError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Unknown tenant: {0}")]
    UnknownTenant(TenantId),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type PoolResult<T> = Result<T, PoolError>;

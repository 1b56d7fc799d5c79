//! Container runtime abstraction.

use crate::error::RuntimeResult;
use async_trait::async_trait;
use std::time::Duration;

/// Everything needed to create one gateway container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name, unique per tenant.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Environment passed to the gateway process.
    pub env: Vec<(String, String)>,
    /// Host port bound on the loopback interface.
    pub host_port: u16,
    /// Port the gateway listens on inside the container.
    pub container_port: u16,
    /// Labels for operational traceability.
    pub labels: Vec<(String, String)>,
}

/// Opaque reference to a created container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    /// Runtime-assigned id.
    pub id: String,
    /// Name the container was created with.
    pub name: String,
}

/// Result of inspecting a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerState {
    pub running: bool,
}

/// The consumed process/container runtime interface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container from `spec` without starting it.
    async fn create(&self, spec: &ContainerSpec) -> RuntimeResult<ContainerRef>;

    /// Start a created container.
    async fn start(&self, container: &ContainerRef) -> RuntimeResult<()>;

    /// Report whether the container's process is running.
    async fn inspect(&self, container: &ContainerRef) -> RuntimeResult<ContainerState>;

    /// Stop the container, allowing `timeout` for a graceful exit
    /// before the runtime force-kills it.
    async fn stop(&self, container: &ContainerRef, timeout: Duration) -> RuntimeResult<()>;

    /// Remove the container, force-terminating it if still running.
    async fn remove(&self, container: &ContainerRef) -> RuntimeResult<()>;
}

//! Gateway process lifecycle control.
//!
//! Each tenant's gateway runs as an isolated container. This crate
//! owns creation, start, inspection, stop and removal of those
//! containers, behind a runtime trait so the pool can be exercised
//! against an in-memory implementation. Startup deadlines are enforced
//! by the health monitor, not here: launching is fire-and-poll.

pub mod docker;
pub mod error;
pub mod launcher;
pub mod runtime;

pub use docker::DockerCliRuntime;
pub use error::{ProcessRuntimeError, RuntimeResult};
pub use launcher::{GatewayImageConfig, GatewayLauncher};
pub use runtime::{ContainerRef, ContainerRuntime, ContainerSpec, ContainerState};

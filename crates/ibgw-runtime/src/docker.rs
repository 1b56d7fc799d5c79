//! Docker CLI runtime.
//!
//! Drives the local `docker` binary through `tokio::process::Command`.
//! The CLI is the one interface guaranteed present on every deployment
//! host, and `docker stop -t` gives us the graceful-then-kill semantics
//! the shutdown path needs without extra signal plumbing.

use crate::error::{ProcessRuntimeError, RuntimeResult};
use crate::runtime::{ContainerRef, ContainerRuntime, ContainerSpec, ContainerState};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Container runtime backed by the `docker` CLI.
#[derive(Debug, Clone, Default)]
pub struct DockerCliRuntime {
    /// Binary to invoke; overridable for podman-compatible hosts.
    binary: String,
}

impl DockerCliRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    /// Use an alternative docker-compatible binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(
        &self,
        action: &'static str,
        container: &str,
        args: &[String],
    ) -> RuntimeResult<String> {
        debug!(action, container, "Running docker command");
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProcessRuntimeError::CommandFailed {
                action,
                container: container.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Build the `docker create` argument vector for a spec.
fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "-p".to_string(),
        format!("127.0.0.1:{}:{}", spec.host_port, spec.container_port),
    ];
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    for (key, value) in &spec.labels {
        args.push("--label".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push(spec.image.clone());
    args
}

#[async_trait]
impl ContainerRuntime for DockerCliRuntime {
    async fn create(&self, spec: &ContainerSpec) -> RuntimeResult<ContainerRef> {
        let id = self.run("create", &spec.name, &create_args(spec)).await?;
        if id.is_empty() {
            return Err(ProcessRuntimeError::UnexpectedOutput {
                container: spec.name.clone(),
                output: "docker create returned no container id".to_string(),
            });
        }
        Ok(ContainerRef {
            id,
            name: spec.name.clone(),
        })
    }

    async fn start(&self, container: &ContainerRef) -> RuntimeResult<()> {
        self.run(
            "start",
            &container.name,
            &["start".to_string(), container.id.clone()],
        )
        .await?;
        Ok(())
    }

    async fn inspect(&self, container: &ContainerRef) -> RuntimeResult<ContainerState> {
        let output = self
            .run(
                "inspect",
                &container.name,
                &[
                    "inspect".to_string(),
                    "-f".to_string(),
                    "{{.State.Running}}".to_string(),
                    container.id.clone(),
                ],
            )
            .await?;

        match output.as_str() {
            "true" => Ok(ContainerState { running: true }),
            "false" => Ok(ContainerState { running: false }),
            other => Err(ProcessRuntimeError::UnexpectedOutput {
                container: container.name.clone(),
                output: other.to_string(),
            }),
        }
    }

    async fn stop(&self, container: &ContainerRef, timeout: Duration) -> RuntimeResult<()> {
        self.run(
            "stop",
            &container.name,
            &[
                "stop".to_string(),
                "-t".to_string(),
                timeout.as_secs().to_string(),
                container.id.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn remove(&self, container: &ContainerRef) -> RuntimeResult<()> {
        if let Err(e) = self
            .run(
                "remove",
                &container.name,
                &[
                    "rm".to_string(),
                    "-f".to_string(),
                    container.id.clone(),
                ],
            )
            .await
        {
            // A container that is already gone is not a removal failure.
            if let ProcessRuntimeError::CommandFailed { stderr, .. } = &e {
                if stderr.contains("No such container") {
                    warn!(container = %container.name, "Container already removed");
                    return Ok(());
                }
            }
            return Err(e);
        }
        Ok(())
    }
}

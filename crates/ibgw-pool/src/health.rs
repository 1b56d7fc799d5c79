//! Per-instance connection health monitoring.
//!
//! One background task per gateway instance drives the state machine:
//! while STARTING it polls process liveness and attempts the protocol
//! connect under the startup deadline; while RUNNING it verifies both
//! process and protocol liveness every tick and runs bounded-backoff
//! reconnection when either fails. Checks for different instances run
//! in independent tasks, so a slow tenant never delays another.
//!
//! Lock discipline: instance state is read under a short lock, every
//! suspending call (inspect, connect, is_connected, stop) is made with
//! no lock held, and results are written back under a fresh lock.

use crate::config::PoolConfig;
use crate::registry::{GatewayRegistry, SharedInstance};
use crate::resources::ResourcePools;
use crate::shutdown::teardown_instance;
use ibgw_core::GatewayStatus;
use ibgw_protocol::{BrokerClient, GatewayEndpoint};
use ibgw_runtime::ContainerRuntime;
use ibgw_secrets::Credentials;
use ibgw_telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A spawned monitor: its cancellation token plus join handle.
///
/// Cancellation is confirmed (the task joined) before the instance's
/// resources are released, so a stale check can never race a fresh
/// instance created for the same tenant.
pub struct MonitorTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl MonitorTask {
    /// Cancel the monitor and wait up to `timeout` for it to exit,
    /// aborting it outright if it does not.
    pub async fn cancel_and_join(mut self, timeout: Duration) {
        self.token.cancel();
        if tokio::time::timeout(timeout, &mut self.handle)
            .await
            .is_err()
        {
            warn!("Monitor task did not exit within timeout, aborting");
            self.handle.abort();
        }
    }

    /// Cancel and abort without waiting.
    pub fn abort(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

/// Outcome of one monitor tick.
enum Tick {
    /// Keep monitoring.
    Continue,
    /// Instance reached a terminal state; the task exits.
    Done,
}

/// Spawns and drives one health-check task per gateway instance.
pub struct HealthMonitor {
    registry: Arc<GatewayRegistry>,
    runtime: Arc<dyn ContainerRuntime>,
    broker: Arc<dyn BrokerClient>,
    pools: Arc<ResourcePools>,
    config: PoolConfig,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(
        registry: Arc<GatewayRegistry>,
        runtime: Arc<dyn ContainerRuntime>,
        broker: Arc<dyn BrokerClient>,
        pools: Arc<ResourcePools>,
        config: PoolConfig,
    ) -> Self {
        Self {
            registry,
            runtime,
            broker,
            pools,
            config,
        }
    }

    /// Spawn the monitor task for one instance.
    ///
    /// The resolved credentials live only inside this task; the
    /// registry never stores secret material.
    pub fn spawn(
        self: &Arc<Self>,
        endpoint: GatewayEndpoint,
        credentials: Credentials,
    ) -> MonitorTask {
        let token = CancellationToken::new();
        let monitor = Arc::clone(self);
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            monitor.run(endpoint, credentials, task_token).await;
        });

        MonitorTask { token, handle }
    }

    async fn run(
        &self,
        endpoint: GatewayEndpoint,
        credentials: Credentials,
        token: CancellationToken,
    ) {
        let tenant = endpoint.tenant_id.clone();
        let mut ticker = tokio::time::interval(self.config.healthcheck_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(tenant = %tenant, "Health monitor started");

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(tenant = %tenant, "Health monitor cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let Some(entry) = self.registry.get(&tenant) else {
                debug!(tenant = %tenant, "Instance removed from registry, monitor exiting");
                return;
            };

            let status = entry.read().status();
            let outcome = match status {
                GatewayStatus::Starting => {
                    self.poll_startup(&entry, &endpoint, &credentials).await
                }
                GatewayStatus::Running => {
                    self.check_running(&entry, &endpoint, &credentials, &token)
                        .await
                }
                GatewayStatus::Stopped | GatewayStatus::Failed => Tick::Done,
            };

            if matches!(outcome, Tick::Done) {
                debug!(tenant = %tenant, "Health monitor finished");
                return;
            }
        }
    }

    /// One STARTING tick: enforce the startup deadline, verify the
    /// process is still up, and attempt the protocol connect.
    async fn poll_startup(
        &self,
        entry: &SharedInstance,
        endpoint: &GatewayEndpoint,
        credentials: &Credentials,
    ) -> Tick {
        let tenant = &endpoint.tenant_id;
        let (elapsed_ms, container) = {
            let instance = entry.read();
            (instance.startup_elapsed_ms(), instance.container.clone())
        };

        if elapsed_ms > self.config.max_startup_ms {
            warn!(
                tenant = %tenant,
                elapsed_ms,
                max_startup_ms = self.config.max_startup_ms,
                "Gateway did not become live within the startup deadline"
            );
            Metrics::startup_failure(tenant.as_str(), "startup_timeout");
            self.fail_instance(entry).await;
            return Tick::Done;
        }

        if let Some(container) = &container {
            match self.runtime.inspect(container).await {
                Ok(state) if !state.running => {
                    warn!(tenant = %tenant, container = %container.name, "Gateway process exited during startup");
                    Metrics::startup_failure(tenant.as_str(), "process_exited");
                    self.fail_instance(entry).await;
                    return Tick::Done;
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(tenant = %tenant, error = %e, "Inspect failed during startup, retrying next tick");
                }
            }
        }

        match self.broker.connect(endpoint, credentials).await {
            Ok(handle) => {
                let mut instance = entry.write();
                match instance.mark_running(handle) {
                    Ok(()) => {
                        info!(
                            tenant = %tenant,
                            port = endpoint.port,
                            client_session_id = endpoint.client_session_id,
                            "Gateway connection live"
                        );
                    }
                    Err(e) => warn!(tenant = %tenant, error = %e, "Could not mark instance running"),
                }
            }
            Err(e) => {
                debug!(tenant = %tenant, elapsed_ms, error = %e, "Gateway not yet accepting sessions");
            }
        }

        Tick::Continue
    }

    /// One RUNNING tick: process liveness plus an explicit protocol
    /// "is connected" query; either failing sends the instance through
    /// the reconnect path.
    async fn check_running(
        &self,
        entry: &SharedInstance,
        endpoint: &GatewayEndpoint,
        credentials: &Credentials,
        token: &CancellationToken,
    ) -> Tick {
        let tenant = &endpoint.tenant_id;
        let (container, connection) = {
            let instance = entry.read();
            (instance.container.clone(), instance.connection.clone())
        };

        let process_ok = match &container {
            Some(container) => matches!(
                self.runtime.inspect(container).await,
                Ok(state) if state.running
            ),
            None => false,
        };

        let protocol_ok = match &connection {
            Some(handle) => self.broker.is_connected(handle).await,
            None => false,
        };

        if process_ok && protocol_ok {
            entry.write().record_heartbeat();
            return Tick::Continue;
        }

        warn!(
            tenant = %tenant,
            process_ok,
            protocol_ok,
            "Health check failed, entering reconnect"
        );

        let stale_handle = {
            let mut instance = entry.write();
            instance.record_failure();
            let handle = instance.connection.take();
            if let Err(e) = instance.transition(GatewayStatus::Starting) {
                warn!(tenant = %tenant, error = %e, "Demotion to reconnect state rejected");
            }
            handle
        };

        if let Some(handle) = stale_handle {
            if let Err(e) = self.broker.disconnect(&handle).await {
                debug!(tenant = %tenant, error = %e, "Stale session disconnect failed");
            }
        }

        self.reconnect(entry, endpoint, credentials, token).await
    }

    /// Bounded exponential backoff reconnection.
    ///
    /// Attempts stop at the configured attempt budget or when the total
    /// window is spent; success restores RUNNING with a fresh handle,
    /// exhaustion fails the instance through the teardown path.
    async fn reconnect(
        &self,
        entry: &SharedInstance,
        endpoint: &GatewayEndpoint,
        credentials: &Credentials,
        token: &CancellationToken,
    ) -> Tick {
        let tenant = &endpoint.tenant_id;
        let budget = &self.config.reconnect;
        let window = Duration::from_millis(budget.window_ms);
        let started = tokio::time::Instant::now();
        let mut attempts = 0u32;

        while attempts < budget.max_attempts && started.elapsed() < window {
            attempts += 1;
            let delay = self
                .config
                .backoff_delay(attempts)
                .min(window.saturating_sub(started.elapsed()));

            tokio::select! {
                () = token.cancelled() => {
                    debug!(tenant = %tenant, "Reconnect cancelled");
                    return Tick::Done;
                }
                () = tokio::time::sleep(delay) => {}
            }

            Metrics::reconnect_attempt(tenant.as_str());
            info!(tenant = %tenant, attempt = attempts, "Reconnect attempt");

            match self.broker.connect(endpoint, credentials).await {
                Ok(handle) => {
                    let mut instance = entry.write();
                    match instance.mark_running(handle) {
                        Ok(()) => {
                            info!(tenant = %tenant, attempt = attempts, "Reconnected");
                            return Tick::Continue;
                        }
                        Err(e) => {
                            warn!(tenant = %tenant, error = %e, "Could not restore running state");
                            return Tick::Done;
                        }
                    }
                }
                Err(e) => {
                    warn!(tenant = %tenant, attempt = attempts, error = %e, "Reconnect attempt failed");
                    entry.write().record_failure();
                }
            }
        }

        warn!(
            tenant = %tenant,
            attempts,
            window_ms = budget.window_ms,
            "Reconnect budget exhausted, failing instance"
        );
        self.fail_instance(entry).await;
        Tick::Done
    }

    /// Teardown path shared by startup timeout and reconnect
    /// exhaustion: stop and remove the container, release resources,
    /// leave the instance visible as FAILED.
    async fn fail_instance(&self, entry: &SharedInstance) {
        teardown_instance(
            &self.runtime,
            &self.pools,
            entry,
            GatewayStatus::Failed,
            self.config.stop_timeout(),
        )
        .await;
    }
}

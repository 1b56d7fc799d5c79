//! Daemon orchestration.
//!
//! Builds the production collaborator set, starts the pool, serves the
//! status endpoint, re-reads the roster on an interval, and runs the
//! coordinated shutdown on SIGINT.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::roster::FileRoster;
use crate::server;
use ibgw_pool::PoolManager;
use ibgw_protocol::RestBrokerClient;
use ibgw_runtime::{DockerCliRuntime, GatewayLauncher};
use ibgw_secrets::{CredentialResolver, VaultClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Environment variable carrying the secret store token.
const VAULT_TOKEN_ENV: &str = "IBGW_VAULT_TOKEN";

/// Main daemon application.
pub struct Application {
    config: AppConfig,
}

impl Application {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run until SIGINT, then stop every gateway within the grace period.
    pub async fn run(self) -> AppResult<()> {
        let resolver = self.build_resolver()?;
        let runtime = Arc::new(DockerCliRuntime::new());
        let broker = Arc::new(RestBrokerClient::new()?);
        let roster = Arc::new(FileRoster::new(&self.config.roster_path));
        let launcher = GatewayLauncher::new(runtime.clone(), self.config.gateway.clone());

        let manager = Arc::new(PoolManager::new(
            self.config.pool.clone(),
            roster,
            runtime,
            broker,
            resolver,
            launcher,
        )?);

        let summary = manager.start().await?;
        info!(
            started = summary.started.len(),
            failed = summary.failed.len(),
            "Initial roster applied"
        );
        for (tenant, err) in &summary.failed {
            warn!(tenant = %tenant, error = %err, "Tenant did not start");
        }

        let server_manager = manager.clone();
        let bind = self.config.status.bind.clone();
        let server_handle = tokio::spawn(async move {
            if let Err(e) = server::serve(server_manager, &bind).await {
                error!(error = %e, "Status endpoint failed");
            }
        });

        let mut refresh =
            tokio::time::interval(Duration::from_secs(self.config.roster_refresh_secs.max(1)));
        refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        refresh.tick().await; // first tick fires immediately

        info!("Entering main loop");
        loop {
            tokio::select! {
                _ = refresh.tick() => {
                    match manager.reload_tenants().await {
                        Ok(summary) if summary.is_noop() => {}
                        Ok(summary) => {
                            info!(
                                started = summary.started.len(),
                                removed = summary.removed.len(),
                                failed = summary.failed.len(),
                                "Roster change applied"
                            );
                        }
                        Err(e) => warn!(error = %e, "Roster reload failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        manager.stop().await;
        server_handle.abort();
        info!("Daemon stopped");
        Ok(())
    }

    /// Store-backed resolver when the store is enabled and a token is
    /// present; otherwise every tenant resolves through the fallback
    /// path.
    fn build_resolver(&self) -> AppResult<CredentialResolver> {
        let store_config = &self.config.secret_store;
        if !store_config.enabled {
            info!("Secret store disabled, using fallback identifiers");
            return Ok(CredentialResolver::disabled(store_config));
        }

        match std::env::var(VAULT_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => {
                let client = VaultClient::new(store_config, token)?;
                info!(addr = %store_config.addr, "Secret store enabled");
                Ok(CredentialResolver::new(Arc::new(client), store_config))
            }
            _ => {
                warn!(
                    env = VAULT_TOKEN_ENV,
                    "Secret store enabled but no token in environment, using fallback identifiers"
                );
                Ok(CredentialResolver::disabled(store_config))
            }
        }
    }
}

//! TOML file roster source.
//!
//! The admin platform writes the enabled-tenant roster to a file the
//! daemon re-reads on every reload, so enabling or disabling a
//! follower never requires a daemon restart.

use async_trait::async_trait;
use ibgw_core::{CoreError, Result as CoreResult, TenantId, TenantRoster, TenantSpec};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RosterFile {
    #[serde(default)]
    tenants: Vec<RosterEntry>,
}

#[derive(Debug, Deserialize)]
struct RosterEntry {
    tenant_id: String,
    #[serde(default)]
    credential_ref: Option<String>,
    fallback_identifier: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Roster backed by a TOML file on disk.
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TenantRoster for FileRoster {
    async fn list_enabled_tenants(&self) -> CoreResult<Vec<TenantSpec>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CoreError::Roster(format!("Failed to read {}: {e}", self.path.display())))?;

        let file: RosterFile = toml::from_str(&content)
            .map_err(|e| CoreError::Roster(format!("Failed to parse {}: {e}", self.path.display())))?;

        let mut specs = Vec::new();
        for entry in file.tenants {
            if !entry.enabled {
                continue;
            }
            specs.push(TenantSpec {
                tenant_id: TenantId::new(entry.tenant_id)?,
                credential_ref: entry.credential_ref,
                fallback_identifier: entry.fallback_identifier,
            });
        }

        debug!(path = %self.path.display(), enabled = specs.len(), "Roster loaded");
        Ok(specs)
    }
}

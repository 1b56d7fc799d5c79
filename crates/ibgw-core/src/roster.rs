//! Read interface over the enabled-tenant roster.
//!
//! The roster source itself (admin database, config file, API) lives
//! outside the pool. `reload_tenants` only ever consumes this trait.

use crate::error::Result;
use crate::types::TenantId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One enabled tenant as reported by the roster source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSpec {
    /// Unique tenant key.
    pub tenant_id: TenantId,
    /// Reference string used to locate the tenant's brokerage
    /// credentials in the secret store (path suffix).
    #[serde(default)]
    pub credential_ref: Option<String>,
    /// Locally configured identifier used when the secret store cannot
    /// produce credentials (paired with a placeholder secret).
    pub fallback_identifier: String,
}

/// Source of the enabled-tenant roster.
#[async_trait]
pub trait TenantRoster: Send + Sync {
    /// List every tenant that should currently hold a live gateway.
    async fn list_enabled_tenants(&self) -> Result<Vec<TenantSpec>>;
}

//! Credential resolution with explicit degradation.

use crate::store::{SecretStore, SecretStoreConfig};
use ibgw_core::TenantSpec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Brokerage login material for one tenant.
///
/// The password is zeroized on drop and never printed; log lines carry
/// only the username.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Credentials from a resolved store pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Placeholder credentials built from the tenant's fallback
    /// identifier. Authentication with these is expected to fail
    /// downstream, which is a handled failure mode, not a crash.
    #[must_use]
    pub fn placeholder(identifier: impl Into<String>) -> Self {
        Self {
            username: identifier.into(),
            password: String::new(),
        }
    }

    /// Whether this is a placeholder (no secret material).
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Why the resolver fell back to the local identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Store disabled in configuration.
    StoreDisabled,
    /// Tenant has no credential_ref, or the path does not exist.
    PathMissing,
    /// Store configured but the lookup itself failed.
    StoreUnreachable,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FallbackReason::StoreDisabled => "store_disabled",
            FallbackReason::PathMissing => "path_missing",
            FallbackReason::StoreUnreachable => "store_unreachable",
        };
        f.write_str(s)
    }
}

/// Outcome of credential resolution.
///
/// Degradation is an expected branch consumed by the caller, not a
/// thrown error; `resolve` itself never fails.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Credentials read from the secret store.
    Store(Credentials),
    /// Local fallback identifier paired with a placeholder secret.
    Fallback {
        credentials: Credentials,
        reason: FallbackReason,
    },
}

impl Resolution {
    /// The credentials regardless of provenance.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        match self {
            Resolution::Store(c) => c,
            Resolution::Fallback { credentials, .. } => credentials,
        }
    }

    /// Consume, yielding the credentials.
    #[must_use]
    pub fn into_credentials(self) -> Credentials {
        match self {
            Resolution::Store(c) => c,
            Resolution::Fallback { credentials, .. } => credentials,
        }
    }

    /// Whether the fallback path was taken.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }
}

/// Resolves per-tenant credentials through the store-then-fallback chain.
pub struct CredentialResolver {
    store: Option<Arc<dyn SecretStore>>,
    namespace: String,
}

impl CredentialResolver {
    /// Resolver backed by a secret store.
    #[must_use]
    pub fn new(store: Arc<dyn SecretStore>, config: &SecretStoreConfig) -> Self {
        Self {
            store: Some(store),
            namespace: config.namespace.clone(),
        }
    }

    /// Resolver with the store disabled; every tenant degrades.
    #[must_use]
    pub fn disabled(config: &SecretStoreConfig) -> Self {
        Self {
            store: None,
            namespace: config.namespace.clone(),
        }
    }

    /// Resolve credentials for a tenant.
    ///
    /// Tries the tenant-scoped store path first, then falls back to the
    /// locally configured identifier. Store unavailability degrades, it
    /// does not error.
    pub async fn resolve(&self, spec: &TenantSpec) -> Resolution {
        let Some(store) = &self.store else {
            debug!(tenant = %spec.tenant_id, "Secret store disabled, using fallback identifier");
            return self.fallback(spec, FallbackReason::StoreDisabled);
        };

        let Some(credential_ref) = &spec.credential_ref else {
            debug!(tenant = %spec.tenant_id, "No credential_ref configured, using fallback identifier");
            return self.fallback(spec, FallbackReason::PathMissing);
        };

        let path = format!("{}/{}", self.namespace, credential_ref);
        match store.get_secret(&path).await {
            Ok(Some(pair)) => {
                debug!(tenant = %spec.tenant_id, username = %pair.username, "Resolved credentials from store");
                Resolution::Store(Credentials::new(pair.username, pair.password))
            }
            Ok(None) => {
                warn!(tenant = %spec.tenant_id, path = %path, "Secret path missing, using fallback identifier");
                self.fallback(spec, FallbackReason::PathMissing)
            }
            Err(e) => {
                warn!(tenant = %spec.tenant_id, path = %path, error = %e, "Secret store lookup failed, using fallback identifier");
                self.fallback(spec, FallbackReason::StoreUnreachable)
            }
        }
    }

    fn fallback(&self, spec: &TenantSpec, reason: FallbackReason) -> Resolution {
        Resolution::Fallback {
            credentials: Credentials::placeholder(spec.fallback_identifier.clone()),
            reason,
        }
    }
}

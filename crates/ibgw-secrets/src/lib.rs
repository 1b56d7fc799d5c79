//! Per-tenant brokerage credential resolution.
//!
//! Credentials are looked up in an external secret store under a
//! tenant-scoped path, with an explicit fallback to a locally
//! configured identifier when the store is disabled, unreachable, or
//! the path is missing. Fallback is an expected branch, not an error:
//! a placeholder credential simply fails authentication downstream.

pub mod error;
pub mod resolver;
pub mod store;

pub use error::{SecretsError, SecretsResult};
pub use resolver::{CredentialResolver, Credentials, FallbackReason, Resolution};
pub use store::{SecretPair, SecretStore, SecretStoreConfig, VaultClient};

//! Core domain types for the ibgw gateway pool.
//!
//! This crate provides fundamental types used throughout the pool manager:
//! - `TenantId`: Unique key for a follower account
//! - `GatewayStatus`: Lifecycle state machine for a gateway instance
//! - `TenantSpec` / `TenantRoster`: Read interface over the enabled-tenant roster
//! - `StatusSnapshot`: Read-only projection for the operational surface

pub mod error;
pub mod roster;
pub mod status;
pub mod types;

pub use error::{CoreError, Result};
pub use roster::{TenantRoster, TenantSpec};
pub use status::{GatewayStatus, StatusSnapshot};
pub use types::TenantId;

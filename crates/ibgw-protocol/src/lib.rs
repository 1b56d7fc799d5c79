//! Brokerage protocol client.
//!
//! The gateway container exposes a local REST bridge; this crate wraps
//! it behind the `BrokerClient` trait consumed by the health monitor:
//! authenticate a session, query its liveness, tear it down. Handles
//! are invalidated on reconnect, so trading logic re-requests one from
//! the pool on every use instead of caching.

pub mod client;
pub mod error;

pub use client::{BrokerClient, ConnectionHandle, GatewayEndpoint, RestBrokerClient};
pub use error::{ProtocolError, ProtocolResult};

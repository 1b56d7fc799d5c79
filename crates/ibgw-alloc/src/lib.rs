//! Finite resource pools for gateway instances.
//!
//! Every live gateway holds exactly one host port and one client
//! session id, drawn from two disjoint configurable ranges. Both pools
//! are independently locked so contention on one never serializes
//! allocations on the other.

pub mod error;
pub mod pool;

pub use error::{AllocError, AllocResult};
pub use pool::{ClientIdPool, IdPool, PortPool};

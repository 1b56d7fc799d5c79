//! Allocator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocError {
    /// The whole range is in use. Indicates a capacity-planning
    /// problem; surfaced to the reload caller, never retried silently.
    #[error("{pool} pool exhausted: all {capacity} values in {start}..={end} are allocated")]
    Exhausted {
        pool: &'static str,
        start: u32,
        end: u32,
        capacity: usize,
    },

    #[error("value {value} is outside {pool} pool range {start}..={end}")]
    OutOfRange {
        pool: &'static str,
        value: u32,
        start: u32,
        end: u32,
    },

    #[error("invalid {pool} pool range: start {start} > end {end}")]
    InvalidRange {
        pool: &'static str,
        start: u32,
        end: u32,
    },
}

pub type AllocResult<T> = Result<T, AllocError>;

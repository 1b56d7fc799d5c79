//! Lock-guarded integer pools.

use crate::error::{AllocError, AllocResult};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tracing::debug;

/// A finite pool of reusable integers in an inclusive range.
///
/// Allocation always hands out the lowest free value, which keeps port
/// assignments dense and makes leaks visible in `docker ps` output.
/// Released values become immediately available again; the caller is
/// responsible for releasing only after the prior holder's process has
/// fully terminated.
#[derive(Debug)]
pub struct IdPool {
    name: &'static str,
    start: u32,
    end: u32,
    free: Mutex<BTreeSet<u32>>,
}

impl IdPool {
    /// Create a pool over `start..=end`.
    pub fn new(name: &'static str, start: u32, end: u32) -> AllocResult<Self> {
        if start > end {
            return Err(AllocError::InvalidRange { pool: name, start, end });
        }
        Ok(Self {
            name,
            start,
            end,
            free: Mutex::new((start..=end).collect()),
        })
    }

    /// Allocate the lowest free value.
    pub fn allocate(&self) -> AllocResult<u32> {
        let mut free = self.free.lock();
        let value = free.iter().next().copied().ok_or(AllocError::Exhausted {
            pool: self.name,
            start: self.start,
            end: self.end,
            capacity: self.capacity(),
        })?;
        free.remove(&value);
        debug!(pool = self.name, value, free = free.len(), "Allocated");
        Ok(value)
    }

    /// Return a value to the pool.
    ///
    /// Releasing a value that is already free is a no-op; releasing a
    /// value outside the range is rejected.
    pub fn release(&self, value: u32) -> AllocResult<()> {
        if value < self.start || value > self.end {
            return Err(AllocError::OutOfRange {
                pool: self.name,
                value,
                start: self.start,
                end: self.end,
            });
        }
        let mut free = self.free.lock();
        free.insert(value);
        debug!(pool = self.name, value, free = free.len(), "Released");
        Ok(())
    }

    /// Total number of values in the range.
    #[must_use]
    pub fn capacity(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    /// Number of values currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    /// Number of values currently allocated.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.capacity() - self.available()
    }

    /// Whether a specific value is currently allocated.
    #[must_use]
    pub fn is_allocated(&self, value: u32) -> bool {
        value >= self.start && value <= self.end && !self.free.lock().contains(&value)
    }
}

/// Host-port pool for gateway API sockets.
#[derive(Debug)]
pub struct PortPool(IdPool);

impl PortPool {
    pub fn new(start: u16, end: u16) -> AllocResult<Self> {
        Ok(Self(IdPool::new("port", u32::from(start), u32::from(end))?))
    }

    pub fn allocate(&self) -> AllocResult<u16> {
        // Range is constructed from u16 bounds, value always fits.
        self.0.allocate().map(|v| v as u16)
    }

    pub fn release(&self, port: u16) -> AllocResult<()> {
        self.0.release(u32::from(port))
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.0.available()
    }

    #[must_use]
    pub fn allocated(&self) -> usize {
        self.0.allocated()
    }

    #[must_use]
    pub fn is_allocated(&self, port: u16) -> bool {
        self.0.is_allocated(u32::from(port))
    }
}

/// Client-session-id pool for brokerage API sessions.
#[derive(Debug)]
pub struct ClientIdPool(IdPool);

impl ClientIdPool {
    pub fn new(start: u32, end: u32) -> AllocResult<Self> {
        Ok(Self(IdPool::new("client_id", start, end)?))
    }

    pub fn allocate(&self) -> AllocResult<u32> {
        self.0.allocate()
    }

    pub fn release(&self, id: u32) -> AllocResult<()> {
        self.0.release(id)
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.0.available()
    }

    #[must_use]
    pub fn allocated(&self) -> usize {
        self.0.allocated()
    }

    #[must_use]
    pub fn is_allocated(&self, id: u32) -> bool {
        self.0.is_allocated(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_allocates_lowest_first() {
        let pool = IdPool::new("test", 10, 12).unwrap();
        assert_eq!(pool.allocate().unwrap(), 10);
        assert_eq!(pool.allocate().unwrap(), 11);
        assert_eq!(pool.allocate().unwrap(), 12);
    }

    #[test]
    fn test_exhaustion_surfaces() {
        let pool = IdPool::new("test", 1, 2).unwrap();
        pool.allocate().unwrap();
        pool.allocate().unwrap();
        let err = pool.allocate().unwrap_err();
        assert!(matches!(err, AllocError::Exhausted { capacity: 2, .. }));
    }

    #[test]
    fn test_release_makes_value_reusable() {
        let pool = IdPool::new("test", 5, 5).unwrap();
        let v = pool.allocate().unwrap();
        assert!(pool.allocate().is_err());
        pool.release(v).unwrap();
        assert_eq!(pool.allocate().unwrap(), v);
    }

    #[test]
    fn test_release_out_of_range_rejected() {
        let pool = IdPool::new("test", 5, 9).unwrap();
        assert!(matches!(
            pool.release(4).unwrap_err(),
            AllocError::OutOfRange { value: 4, .. }
        ));
        assert!(pool.release(12).is_err());
    }

    #[test]
    fn test_double_release_idempotent() {
        let pool = IdPool::new("test", 1, 3).unwrap();
        let v = pool.allocate().unwrap();
        pool.release(v).unwrap();
        pool.release(v).unwrap();
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_invalid_range_rejected() {
        assert!(IdPool::new("test", 9, 5).is_err());
    }

    #[test]
    fn test_concurrent_allocation_disjoint() {
        let pool = Arc::new(IdPool::new("test", 0, 999).unwrap());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(std::thread::spawn(move || {
                let mut got = Vec::new();
                for _ in 0..100 {
                    got.push(pool.allocate().unwrap());
                }
                got
            }));
        }

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        // No two callers ever hold the same value.
        assert_eq!(all.len(), total);
        assert_eq!(pool.allocated(), total);
    }

    #[test]
    fn test_port_pool_u16_bounds() {
        let pool = PortPool::new(4100, 4102).unwrap();
        assert_eq!(pool.allocate().unwrap(), 4100);
        assert!(pool.is_allocated(4100));
        pool.release(4100).unwrap();
        assert!(!pool.is_allocated(4100));
    }
}

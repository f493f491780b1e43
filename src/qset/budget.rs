//! Memory budget
//!
//! Per-device accounting of quantum bytes, with a scoped reservation that
//! refunds everything it charged unless it is committed.

use crate::error::{QdevError, Result};

/// Tracks quantum bytes held by one device
#[derive(Debug)]
pub struct MemoryBudget {
    /// Upper bound on `used` (None = unbounded)
    limit: Option<usize>,

    /// Bytes currently held by live quanta
    used: usize,
}

impl MemoryBudget {
    pub fn new(limit: Option<usize>) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Start a transactional reservation against this budget
    pub fn reserve(&mut self) -> Reservation<'_> {
        Reservation {
            budget: self,
            charged: 0,
        }
    }

    /// Forget every charge (the chain was destroyed)
    pub fn reset(&mut self) {
        self.used = 0;
    }
}

/// Charges made while building one allocation
///
/// Dropping an uncommitted reservation returns its bytes to the budget.
pub struct Reservation<'a> {
    budget: &'a mut MemoryBudget,
    charged: usize,
}

impl Reservation<'_> {
    /// Charge `bytes`, failing with `OutOfMemory` past the limit
    pub fn charge(&mut self, bytes: usize) -> Result<()> {
        let wanted = self
            .budget
            .used
            .checked_add(bytes)
            .ok_or(QdevError::OutOfMemory { requested: bytes })?;

        if let Some(limit) = self.budget.limit {
            if wanted > limit {
                return Err(QdevError::OutOfMemory { requested: bytes });
            }
        }

        self.budget.used = wanted;
        self.charged += bytes;
        Ok(())
    }

    /// Bytes charged so far
    pub fn charged(&self) -> usize {
        self.charged
    }

    /// Keep the charges
    pub fn commit(mut self) {
        self.charged = 0;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.charged > 0 {
            tracing::trace!(bytes = self.charged, "refunding uncommitted reservation");
            self.budget.used -= self.charged;
        }
    }
}

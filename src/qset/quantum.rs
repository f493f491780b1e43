//! Quantum
//!
//! Fixed-size, zero-filled byte block: the leaf allocation unit.

use crate::error::{QdevError, Result};

/// One quantum of device storage
pub struct Quantum {
    data: Box<[u8]>,
}

impl Quantum {
    /// Allocate `size` zero bytes, reporting allocator failure as `OutOfMemory`
    pub fn zeroed(size: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| QdevError::OutOfMemory { requested: size })?;
        data.resize(size, 0);

        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl std::fmt::Debug for Quantum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Quantum").field("len", &self.data.len()).finish()
    }
}

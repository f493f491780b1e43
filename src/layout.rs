//! Address Translator
//!
//! Maps a linear byte offset onto the two-level block list.
//!
//! ```text
//!   pos ──► set_index     = pos / span
//!           quantum_index = (pos % span) / quantum_size
//!           quantum_offset= (pos % span) % quantum_size
//!
//!   span = quantum_per_set × quantum_size
//! ```
//!
//! Read and write both go through [`Layout::translate`], so they always
//! agree on which block-set, quantum and byte an offset names.

use crate::error::{QdevError, Result};

/// Fixed geometry of one device's block list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    quantum_size: usize,
    quantum_per_set: usize,
}

/// Position of a byte inside the block list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    /// Block-set hops from the chain head
    pub set_index: usize,

    /// Slot inside the block-set
    pub quantum_index: usize,

    /// Byte inside the quantum
    pub quantum_offset: usize,
}

impl Layout {
    /// Create a layout; both dimensions must be positive
    pub fn new(quantum_size: usize, quantum_per_set: usize) -> Result<Self> {
        if quantum_size == 0 || quantum_per_set == 0 {
            return Err(QdevError::Config(format!(
                "invalid geometry: quantum_size={}, quantum_per_set={}",
                quantum_size, quantum_per_set
            )));
        }
        (quantum_size as u64)
            .checked_mul(quantum_per_set as u64)
            .ok_or_else(|| QdevError::Config("block-set span overflows u64".to_string()))?;

        Ok(Self {
            quantum_size,
            quantum_per_set,
        })
    }

    pub fn quantum_size(&self) -> usize {
        self.quantum_size
    }

    pub fn quantum_per_set(&self) -> usize {
        self.quantum_per_set
    }

    /// Bytes addressable by one block-set
    pub fn span(&self) -> u64 {
        self.quantum_size as u64 * self.quantum_per_set as u64
    }

    /// Translate `pos` into (block-set, quantum, offset)
    ///
    /// Fails with `AddressingFault` if the computed quantum index is out of
    /// range, or if the block-set index does not fit in `usize`.
    pub fn translate(&self, pos: u64) -> Result<Address> {
        let span = self.span();
        let within = pos % span;
        let quantum_size = self.quantum_size as u64;

        let quantum_index = (within / quantum_size) as usize;
        let quantum_offset = (within % quantum_size) as usize;

        if quantum_index >= self.quantum_per_set {
            tracing::error!(
                quantum_index,
                quantum_per_set = self.quantum_per_set,
                "quantum index exceeds limit"
            );
            return Err(QdevError::AddressingFault {
                quantum_index,
                quantum_per_set: self.quantum_per_set,
            });
        }

        let set_index = usize::try_from(pos / span).map_err(|_| QdevError::AddressingFault {
            quantum_index,
            quantum_per_set: self.quantum_per_set,
        })?;

        Ok(Address {
            set_index,
            quantum_index,
            quantum_offset,
        })
    }

    /// Bytes left in the quantum from `address` onward
    pub fn available(&self, address: &Address) -> usize {
        self.quantum_size - address.quantum_offset
    }
}

//! Block-set
//!
//! Fixed-length array of quantum slots. A slot is `None` until its quantum
//! is allocated (always the case right after creation under lazy fill).

use super::budget::MemoryBudget;
use super::quantum::Quantum;
use crate::error::Result;

/// Second-level block of the device chain
#[derive(Debug)]
pub struct BlockSet {
    slots: Vec<Option<Quantum>>,
}

impl BlockSet {
    /// Wrap a fully built slot array
    pub(crate) fn from_slots(slots: Vec<Option<Quantum>>) -> Self {
        Self { slots }
    }

    /// Number of slots (always `quantum_per_set`)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding a quantum
    pub fn populated_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Quantum at `index`, if it was ever allocated
    pub fn quantum(&self, index: usize) -> Option<&Quantum> {
        self.slots.get(index)?.as_ref()
    }

    pub fn quantum_mut(&mut self, index: usize) -> Option<&mut Quantum> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Return the quantum at `index`, allocating it first if absent
    ///
    /// On failure the slot stays absent and nothing is charged.
    pub(crate) fn populate(
        &mut self,
        index: usize,
        quantum_size: usize,
        budget: &mut MemoryBudget,
    ) -> Result<&mut Quantum> {
        let slot = &mut self.slots[index];

        let quantum = match slot.take() {
            Some(quantum) => quantum,
            None => {
                let mut reservation = budget.reserve();
                reservation.charge(quantum_size)?;
                let quantum = Quantum::zeroed(quantum_size)?;
                reservation.commit();

                tracing::trace!(quantum_index = index, quantum_size, "allocated quantum");
                quantum
            }
        };

        Ok(slot.insert(quantum))
    }

    /// Free every present quantum, returning how many there were
    pub(crate) fn release(self) -> usize {
        let populated = self.populated_count();
        drop(self.slots);
        populated
    }
}

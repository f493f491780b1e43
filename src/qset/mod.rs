//! Block-set Module
//!
//! Storage building blocks and the block-set allocator.
//!
//! ## Structure
//! ```text
//!   chain[0]            chain[1]            chain[n]
//!  ┌──────────┐        ┌──────────┐        ┌──────────┐
//!  │ BlockSet │ ─────► │ BlockSet │ ─ … ─► │ BlockSet │
//!  └────┬─────┘        └────┬─────┘        └────┬─────┘
//!       │ quantum_per_set slots                 │
//!       ▼                                       ▼
//!  [Q][Q][ ][Q] …                          [Q][ ][ ] …
//!   quantum_size bytes each, absent slots read as holes
//! ```
//!
//! ## Allocation Rules
//! - A block-set is built completely before it is returned
//! - Any failure while building releases every quantum acquired so far
//!   and refunds the budget, so a half-built block-set never escapes

mod block_set;
mod budget;
mod quantum;

pub use block_set::BlockSet;
pub use budget::{MemoryBudget, Reservation};
pub use quantum::Quantum;

use crate::config::QuantumFill;
use crate::error::{QdevError, Result};
use crate::layout::Layout;

/// Build one block-set for `layout`
///
/// Under [`QuantumFill::Eager`] every slot is zero-filled up front; under
/// [`QuantumFill::Lazy`] all slots start absent. Either the whole block-set
/// is returned, or nothing stays allocated and the budget is unchanged.
pub fn allocate_block_set(
    layout: &Layout,
    fill: QuantumFill,
    budget: &mut MemoryBudget,
) -> Result<BlockSet> {
    let quantum_per_set = layout.quantum_per_set();
    let quantum_size = layout.quantum_size();

    let mut slots: Vec<Option<Quantum>> = Vec::new();
    slots
        .try_reserve_exact(quantum_per_set)
        .map_err(|_| QdevError::OutOfMemory {
            requested: quantum_per_set * std::mem::size_of::<Option<Quantum>>(),
        })?;

    let mut reservation = budget.reserve();

    match fill {
        QuantumFill::Eager => {
            for index in 0..quantum_per_set {
                // Early return drops `slots` and `reservation`, releasing
                // quanta 0..index and refunding their bytes.
                let quantum = reservation
                    .charge(quantum_size)
                    .and_then(|()| Quantum::zeroed(quantum_size))
                    .inspect_err(|e| {
                        tracing::warn!(index, quantum_per_set, error = %e, "block-set allocation failed");
                    })?;
                slots.push(Some(quantum));
            }
        }
        QuantumFill::Lazy => slots.resize_with(quantum_per_set, || None),
    }

    let charged = reservation.charged();
    reservation.commit();

    tracing::debug!(
        quantum_per_set,
        quantum_size,
        bytes = charged,
        "allocated block-set"
    );

    Ok(BlockSet::from_slots(slots))
}

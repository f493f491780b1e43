//! Device Module
//!
//! One growable, sparse, byte-addressable storage unit.
//!
//! ## Responsibilities
//! - Own the block-set chain, the logical size and the memory budget
//! - Serve positional reads and writes, at most one quantum per call
//! - Grow the chain lazily on write, never on read
//! - Destroy the whole chain in one pass on teardown
//!
//! ## Concurrency Model
//! Every device owns one exclusive `parking_lot::Mutex`. Read, write and
//! teardown hold it for their entire body (translation, allocation, copy,
//! size update), so each call is atomic with respect to every other call
//! on the same device. Devices never share a lock.

mod buffer;
mod session;

pub use buffer::{Sink, Source};
pub use session::Session;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::config::{Config, Lifecycle, QuantumFill};
use crate::error::{QdevError, Result};
use crate::layout::Layout;
use crate::qset::{allocate_block_set, BlockSet, MemoryBudget};

/// What a teardown released
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseStats {
    /// Block-sets unlinked and freed
    pub block_sets: usize,

    /// Quanta freed (absent slots are not counted)
    pub quanta: usize,

    /// Quantum bytes returned to the budget
    pub bytes: usize,
}

impl ReleaseStats {
    /// Add another device's totals to this one
    pub fn merge(&mut self, other: ReleaseStats) {
        self.block_sets += other.block_sets;
        self.quanta += other.quanta;
        self.bytes += other.bytes;
    }
}

/// Mutable state guarded by the device lock
struct DeviceState {
    /// Block-set chain; entry `n` covers `[n * span, (n + 1) * span)`
    chain: Vec<BlockSet>,

    /// One past the highest byte offset ever written
    size: u64,

    /// Quantum bytes held by the chain
    budget: MemoryBudget,
}

/// A single storage device
pub struct Device {
    /// Position in the owning device set
    index: usize,

    /// Display name (`qdev0`, `qdev1`, ...)
    name: String,

    layout: Layout,
    fill: QuantumFill,
    lifecycle: Lifecycle,

    state: Mutex<DeviceState>,
}

impl Device {
    /// Create an empty device; nothing is allocated until the first write
    pub fn new(index: usize, config: &Config) -> Result<Self> {
        let layout = Layout::new(config.quantum_size, config.quantum_per_set)?;

        Ok(Self {
            index,
            name: format!("{}{}", config.device_name, index),
            layout,
            fill: config.fill,
            lifecycle: config.lifecycle,
            state: Mutex::new(DeviceState {
                chain: Vec::new(),
                size: 0,
                budget: MemoryBudget::new(config.memory_limit),
            }),
        })
    }

    // =========================================================================
    // Read Path
    // =========================================================================

    /// Read into `buf` starting at `pos`
    ///
    /// Delivers at most the rest of one quantum. Returns `Ok(0)` at or past
    /// the end of data and over holes.
    pub fn read_at(&self, buf: &mut [u8], pos: u64) -> Result<usize> {
        self.read_into(buf, pos)
    }

    /// Read into an arbitrary caller buffer starting at `pos`
    ///
    /// A short delivery is returned as-is; only a delivery of zero bytes
    /// is reported as `AccessFault`.
    pub fn read_into<S: Sink + ?Sized>(&self, dest: &mut S, pos: u64) -> Result<usize> {
        let state = self.state.lock();

        let count = dest.capacity();
        if count == 0 {
            return Ok(0);
        }

        if pos >= state.size {
            tracing::trace!(device = %self.name, pos, size = state.size, "eof reached");
            return Ok(0);
        }
        let count = count.min(usize::try_from(state.size - pos).unwrap_or(usize::MAX));

        let address = self.layout.translate(pos)?;

        // Walk, never extend: a short chain is a hole
        let Some(set) = state.chain.get(address.set_index) else {
            tracing::trace!(device = %self.name, set_index = address.set_index, "chain ends before set");
            return Ok(0);
        };
        let Some(quantum) = set.quantum(address.quantum_index) else {
            tracing::trace!(
                device = %self.name,
                quantum_index = address.quantum_index,
                "absent quantum"
            );
            return Ok(0);
        };

        let to_copy = count.min(self.layout.available(&address));
        let start = address.quantum_offset;
        let delivered = dest.deliver(&quantum.as_slice()[start..start + to_copy]);

        if delivered == 0 {
            return Err(QdevError::AccessFault);
        }
        if delivered < to_copy {
            tracing::debug!(device = %self.name, to_copy, delivered, "short delivery");
        }

        tracing::trace!(device = %self.name, pos, delivered, "read");
        Ok(delivered)
    }

    /// Read from `pos` until a call returns zero bytes
    ///
    /// Stops at the end of data or at the first hole. The lock is taken per
    /// quantum, so concurrent writers may interleave between chunks.
    pub fn read_to_end_at(&self, mut pos: u64) -> Result<Bytes> {
        let mut out = BytesMut::new();
        let mut chunk = self.read_buffer(self.layout.quantum_size())?;

        loop {
            let n = self.read_at(&mut chunk, pos)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
            pos += n as u64;
        }

        Ok(out.freeze())
    }

    /// Zeroed destination for a read of up to `count` bytes
    ///
    /// A read never delivers more than one quantum, so `count` is clamped to
    /// the quantum size before anything is allocated.
    pub fn read_buffer(&self, count: usize) -> Result<Vec<u8>> {
        let len = count.min(self.layout.quantum_size());

        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| QdevError::OutOfMemory { requested: len })?;
        buf.resize(len, 0);
        Ok(buf)
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Write `data` starting at `pos`
    ///
    /// Writes at most the rest of one quantum and returns how many bytes
    /// were stored; callers loop for larger buffers.
    pub fn write_at(&self, data: &[u8], pos: u64) -> Result<usize> {
        self.write_from(data, pos)
    }

    /// Write from an arbitrary caller buffer starting at `pos`
    ///
    /// A faulting source aborts the call before anything is stored.
    /// Out-of-memory leaves the chain as far as it was successfully
    /// extended and `size` untouched.
    pub fn write_from<S: Source + ?Sized>(&self, src: &S, pos: u64) -> Result<usize> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let address = self.layout.translate(pos)?;

        let to_copy = src.len().min(self.layout.available(&address));
        if to_copy == 0 {
            return Ok(0);
        }
        let end = pos
            .checked_add(to_copy as u64)
            .ok_or_else(|| QdevError::InvalidArgument(format!("write past u64 range at {}", pos)))?;

        let bytes = src.fetch(to_copy)?;

        self.extend_chain(state, address.set_index)?;

        let set = &mut state.chain[address.set_index];
        let quantum = set.populate(
            address.quantum_index,
            self.layout.quantum_size(),
            &mut state.budget,
        )?;

        let start = address.quantum_offset;
        quantum.as_mut_slice()[start..start + to_copy].copy_from_slice(bytes);

        if end > state.size {
            state.size = end;
        }

        tracing::trace!(device = %self.name, pos, written = to_copy, size = state.size, "write");
        Ok(to_copy)
    }

    /// Append block-sets until `set_index` exists
    ///
    /// Each link is fully built before it is pushed.
    fn extend_chain(&self, state: &mut DeviceState, set_index: usize) -> Result<()> {
        while state.chain.len() <= set_index {
            state
                .chain
                .try_reserve(1)
                .map_err(|_| QdevError::OutOfMemory {
                    requested: std::mem::size_of::<BlockSet>(),
                })?;

            let set = allocate_block_set(&self.layout, self.fill, &mut state.budget)
                .inspect_err(|e| {
                    tracing::warn!(
                        device = %self.name,
                        set_index = state.chain.len(),
                        error = %e,
                        "chain extension failed"
                    );
                })?;

            state.chain.push(set);
            tracing::debug!(device = %self.name, set_index = state.chain.len() - 1, "linked block-set");
        }

        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Destroy the whole chain and reset `size` to zero
    ///
    /// Idempotent; the device behaves as freshly created afterwards.
    pub fn teardown(&self) -> ReleaseStats {
        let mut state = self.state.lock();

        let mut stats = ReleaseStats {
            bytes: state.budget.used(),
            ..ReleaseStats::default()
        };

        for set in state.chain.drain(..) {
            stats.quanta += set.release();
            stats.block_sets += 1;
        }

        state.size = 0;
        state.budget.reset();

        if stats.block_sets > 0 {
            tracing::debug!(
                device = %self.name,
                block_sets = stats.block_sets,
                quanta = stats.quanta,
                "device memory freed"
            );
        }

        stats
    }

    /// Allocate the first block-set if the chain is empty
    pub(crate) fn ensure_head(&self) -> Result<()> {
        let mut guard = self.state.lock();
        self.extend_chain(&mut guard, 0)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// One past the highest byte ever written
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Number of block-sets in the chain
    pub fn block_set_count(&self) -> usize {
        self.state.lock().chain.len()
    }

    /// Number of allocated quanta across the chain
    pub fn quantum_count(&self) -> usize {
        self.state
            .lock()
            .chain
            .iter()
            .map(BlockSet::populated_count)
            .sum()
    }

    /// Quantum bytes currently held
    pub fn allocated_bytes(&self) -> usize {
        self.state.lock().budget.used()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

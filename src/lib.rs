//! # qdev
//!
//! A scull-alike, growable, sparse, byte-addressable in-memory store:
//! - Two-level block list (block-set chain → fixed-size quanta)
//! - Lazy allocation on write, all-or-nothing block-set construction
//! - At most one quantum of data per read/write call
//! - One exclusive lock per device; devices never block each other
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  qdev-shell (glue layer)                     │
//! │               open / release / read / write                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      DeviceSet                               │
//! │           (N devices, addressed by index)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Session   │ ───────► │   Device    │
//!   │  (cursor)   │          │  (Mutex)    │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ Layout::translate
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  BlockSet   │ ─► Quantum × quantum_per_set
//!                           │   chain     │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod qset;
pub mod device;
pub mod registry;
pub mod proc_entry;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, Lifecycle, QuantumFill};
pub use device::{Device, ReleaseStats, Session, Sink, Source};
pub use error::{QdevError, Result};
pub use layout::{Address, Layout};
pub use registry::DeviceSet;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of qdev
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

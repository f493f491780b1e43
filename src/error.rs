//! Error types for qdev
//!
//! Provides a unified error type for all operations.
//!
//! End-of-data and sparse holes are not errors: reads report them as `Ok(0)`.

use thiserror::Error;

/// Result type alias using QdevError
pub type Result<T> = std::result::Result<T, QdevError>;

/// Unified error type for qdev operations
#[derive(Debug, Error)]
pub enum QdevError {
    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Out of memory: could not allocate {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("Addressing fault: quantum index {quantum_index} exceeds limit ({quantum_per_set})")]
    AddressingFault {
        quantum_index: usize,
        quantum_per_set: usize,
    },

    // -------------------------------------------------------------------------
    // Caller Buffer Errors
    // -------------------------------------------------------------------------
    #[error("Access fault: caller buffer could not be copied")]
    AccessFault,

    // -------------------------------------------------------------------------
    // Device Errors
    // -------------------------------------------------------------------------
    #[error("No such device: {0}")]
    NoSuchDevice(usize),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Shell Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QdevError {
    /// Negative errno for glue layers that report failures as integers
    pub fn errno(&self) -> i32 {
        match self {
            QdevError::OutOfMemory { .. } => -12,
            QdevError::AccessFault | QdevError::AddressingFault { .. } => -14,
            QdevError::NoSuchDevice(_) => -19,
            QdevError::InvalidArgument(_) | QdevError::Config(_) | QdevError::Protocol(_) => -22,
            QdevError::Io(_) => -5,
        }
    }
}

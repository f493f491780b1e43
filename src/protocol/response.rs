//! Response definitions
//!
//! Represents answers printed by the shell.

use crate::error::QdevError;

/// A response to print for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Byte or block-set count
    Count(usize),

    /// Bytes read back
    Data(Vec<u8>),

    /// Device summary
    Stat {
        name: String,
        size: u64,
        block_sets: usize,
        quanta: usize,
    },

    Pong,
    Bye,

    /// Failed command
    Error { errno: i32, message: String },
}

impl Response {
    /// Create an ERROR response from a failed operation
    pub fn error(err: &QdevError) -> Self {
        Self::Error {
            errno: err.errno(),
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

//! Command definitions
//!
//! Represents commands typed into the shell.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Write,
    Read,
    Cat,
    Stat,
    Reset,
    ProcRead,
    ProcWrite,
    Ping,
    Quit,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `data` at `pos` (one quantum at most)
    Write { device: usize, pos: u64, data: Vec<u8> },

    /// Read up to `count` bytes at `pos` (one quantum at most)
    Read { device: usize, pos: u64, count: usize },

    /// Read from offset 0 until end of data or the first hole
    Cat { device: usize },

    /// Report size and chain shape
    Stat { device: usize },

    /// Tear the device's storage down
    Reset { device: usize },

    /// Show the proc entry
    ProcRead,

    /// Replace the proc entry's message
    ProcWrite { data: Vec<u8> },

    /// Health check
    Ping,

    /// End the session
    Quit,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Write { .. } => CommandType::Write,
            Command::Read { .. } => CommandType::Read,
            Command::Cat { .. } => CommandType::Cat,
            Command::Stat { .. } => CommandType::Stat,
            Command::Reset { .. } => CommandType::Reset,
            Command::ProcRead => CommandType::ProcRead,
            Command::ProcWrite { .. } => CommandType::ProcWrite,
            Command::Ping => CommandType::Ping,
            Command::Quit => CommandType::Quit,
        }
    }
}

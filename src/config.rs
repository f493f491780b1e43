//! Configuration for qdev
//!
//! Centralized configuration with sensible defaults.
//!
//! `quantum_size` and `quantum_per_set` are fixed for the lifetime of a
//! device set: they are read once when the devices are created.

use crate::error::{QdevError, Result};
use crate::proc_entry::{DEFAULT_INIT_WORD, MAX_MESSAGE};

/// Main configuration for a qdev device set
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Geometry
    // -------------------------------------------------------------------------
    /// Bytes per quantum (the leaf allocation unit)
    pub quantum_size: usize,

    /// Quantum slots per block-set
    pub quantum_per_set: usize,

    // -------------------------------------------------------------------------
    // Device Set
    // -------------------------------------------------------------------------
    /// Number of independently lockable devices
    pub device_count: usize,

    /// Base name; device `i` is called `{device_name}{i}`
    pub device_name: String,

    // -------------------------------------------------------------------------
    // Storage Policy
    // -------------------------------------------------------------------------
    /// When storage is released
    pub lifecycle: Lifecycle,

    /// When quanta inside a new block-set are allocated
    pub fill: QuantumFill,

    /// Per-device cap on quantum bytes (None = host allocator only)
    pub memory_limit: Option<usize>,

    // -------------------------------------------------------------------------
    // Proc Entry
    // -------------------------------------------------------------------------
    /// Shown by the proc entry until the first message is written
    pub init_word: String,
}

/// Storage lifecycle of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Storage lives until device teardown; open/release allocate nothing
    DeviceScoped,

    /// Open allocates the first block-set, release tears the chain down
    SessionScoped,
}

/// Quantum allocation policy for new block-sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantumFill {
    /// Every slot is zero-filled when the block-set is created
    Eager,

    /// Slots start absent; a quantum is allocated on the first write into it
    Lazy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quantum_size: 4000,
            quantum_per_set: 1000,
            device_count: 3,
            device_name: "qdev".to_string(),
            lifecycle: Lifecycle::DeviceScoped,
            fill: QuantumFill::Eager,
            memory_limit: None,
            init_word: DEFAULT_INIT_WORD.to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the configuration before any device is created
    pub fn validate(&self) -> Result<()> {
        if self.quantum_size == 0 {
            return Err(QdevError::Config("quantum_size must be positive".to_string()));
        }
        if self.quantum_per_set == 0 {
            return Err(QdevError::Config(
                "quantum_per_set must be positive".to_string(),
            ));
        }
        if self.device_count == 0 {
            return Err(QdevError::Config("device_count must be positive".to_string()));
        }

        let span = (self.quantum_size as u64).checked_mul(self.quantum_per_set as u64);
        if span.is_none() {
            return Err(QdevError::Config(format!(
                "block-set span overflows: {} x {}",
                self.quantum_per_set, self.quantum_size
            )));
        }

        if self.init_word.len() >= MAX_MESSAGE {
            return Err(QdevError::Config(format!(
                "init_word must be shorter than {} bytes",
                MAX_MESSAGE
            )));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the quantum size (in bytes)
    pub fn quantum_size(mut self, size: usize) -> Self {
        self.config.quantum_size = size;
        self
    }

    /// Set the number of quanta per block-set
    pub fn quantum_per_set(mut self, count: usize) -> Self {
        self.config.quantum_per_set = count;
        self
    }

    /// Set the number of devices
    pub fn device_count(mut self, count: usize) -> Self {
        self.config.device_count = count;
        self
    }

    /// Set the device base name
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.config.device_name = name.into();
        self
    }

    /// Set the storage lifecycle
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.config.lifecycle = lifecycle;
        self
    }

    /// Set the quantum fill policy
    pub fn fill(mut self, fill: QuantumFill) -> Self {
        self.config.fill = fill;
        self
    }

    /// Cap each device's quantum memory (in bytes)
    pub fn memory_limit(mut self, bytes: usize) -> Self {
        self.config.memory_limit = Some(bytes);
        self
    }

    /// Set the proc entry's initial text
    pub fn init_word(mut self, word: impl Into<String>) -> Self {
        self.config.init_word = word.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

//! Device Set
//!
//! A fixed number of independently lockable devices addressed by index,
//! plus the proc entry registered alongside them.
//!
//! ## Responsibilities
//! - Validate the configuration and create every device up front
//! - Hand out sessions on a device index
//! - Route shell commands to the right device
//! - Tear every device down exactly once on unload

use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::config::Config;
use crate::device::{Device, ReleaseStats, Session};
use crate::error::{QdevError, Result};
use crate::proc_entry::ProcEntry;
use crate::protocol::{Command, Response};

/// All devices of one configuration
pub struct DeviceSet {
    config: Config,

    /// Devices padded to separate cache lines so their locks never contend
    devices: Vec<CachePadded<Arc<Device>>>,

    proc_entry: ProcEntry,
}

impl DeviceSet {
    /// Create `config.device_count` empty devices
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let devices = (0..config.device_count)
            .map(|index| Device::new(index, &config).map(|d| CachePadded::new(Arc::new(d))))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            devices = devices.len(),
            quantum_size = config.quantum_size,
            quantum_per_set = config.quantum_per_set,
            "device set initialized"
        );

        let proc_entry = ProcEntry::new(config.init_word.clone());

        Ok(Self {
            config,
            devices,
            proc_entry,
        })
    }

    /// Device at `index`
    pub fn device(&self, index: usize) -> Result<&Arc<Device>> {
        self.devices
            .get(index)
            .map(|d| &**d)
            .ok_or(QdevError::NoSuchDevice(index))
    }

    /// Open a session on device `index`
    pub fn open(&self, index: usize) -> Result<Session> {
        Session::open(Arc::clone(self.device(index)?))
    }

    /// Iterate over devices in index order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.iter().map(|d| &**d)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn proc_entry(&self) -> &ProcEntry {
        &self.proc_entry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Free every device's storage (module unload)
    pub fn teardown(&self) -> ReleaseStats {
        let mut total = ReleaseStats::default();
        for device in self.iter() {
            total.merge(device.teardown());
        }

        tracing::info!(
            block_sets = total.block_sets,
            quanta = total.quanta,
            "device set torn down"
        );
        total
    }

    // =========================================================================
    // Command Routing
    // =========================================================================

    /// Execute a shell command
    ///
    /// Routes commands to the device or proc entry they name.
    pub fn execute(&self, command: Command) -> Result<Response> {
        tracing::debug!(command = ?command.command_type(), "executing command");

        match command {
            Command::Write { device, pos, data } => {
                let written = self.device(device)?.write_at(&data, pos)?;
                Ok(Response::Count(written))
            }
            Command::Read { device, pos, count } => {
                let device = self.device(device)?;
                let mut buf = device.read_buffer(count)?;
                let n = device.read_at(&mut buf, pos)?;
                buf.truncate(n);
                Ok(Response::Data(buf))
            }
            // No session: a session-scoped release would wipe the device
            Command::Cat { device } => {
                let data = self.device(device)?.read_to_end_at(0)?;
                Ok(Response::Data(data.to_vec()))
            }
            Command::Stat { device } => {
                let device = self.device(device)?;
                Ok(Response::Stat {
                    name: device.name().to_string(),
                    size: device.size(),
                    block_sets: device.block_set_count(),
                    quanta: device.quantum_count(),
                })
            }
            Command::Reset { device } => {
                let stats = self.device(device)?.teardown();
                Ok(Response::Count(stats.block_sets))
            }
            Command::ProcRead => Ok(Response::Data(self.proc_entry.contents().into_bytes())),
            Command::ProcWrite { data } => Ok(Response::Count(self.proc_entry.write(&data)?)),
            Command::Ping => Ok(Response::Pong),
            Command::Quit => Ok(Response::Bye),
        }
    }
}

impl Drop for DeviceSet {
    fn drop(&mut self) {
        self.teardown();
    }
}

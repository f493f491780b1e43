//! Session
//!
//! A caller's binding to one device. The session owns the file cursor;
//! the device lock never protects it.

use std::io::SeekFrom;
use std::sync::Arc;

use bytes::Bytes;

use super::{Device, ReleaseStats, Sink, Source};
use crate::config::Lifecycle;
use crate::error::{QdevError, Result};

/// An open handle on a device
#[derive(Debug)]
pub struct Session {
    device: Arc<Device>,

    /// Next offset for cursor-based reads and writes
    pos: u64,

    released: bool,
}

impl Session {
    /// Bind a session to `device`
    ///
    /// Device-scoped storage allocates nothing here. Session-scoped storage
    /// gets its first block-set eagerly.
    pub fn open(device: Arc<Device>) -> Result<Self> {
        if device.lifecycle() == Lifecycle::SessionScoped {
            device.ensure_head()?;
        }

        tracing::debug!(device = %device.name(), "device opened");

        Ok(Self {
            device,
            pos: 0,
            released: false,
        })
    }

    /// Close the session
    ///
    /// Session-scoped storage is torn down; device-scoped storage is kept.
    pub fn release(mut self) -> Result<ReleaseStats> {
        Ok(self.release_inner())
    }

    fn release_inner(&mut self) -> ReleaseStats {
        if self.released {
            return ReleaseStats::default();
        }
        self.released = true;

        tracing::debug!(device = %self.device.name(), "device released");

        match self.device.lifecycle() {
            Lifecycle::DeviceScoped => ReleaseStats::default(),
            Lifecycle::SessionScoped => self.device.teardown(),
        }
    }

    // =========================================================================
    // Cursor I/O
    // =========================================================================

    /// Read at the cursor, advancing it by the bytes delivered
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_into(buf)
    }

    pub fn read_into<S: Sink + ?Sized>(&mut self, dest: &mut S) -> Result<usize> {
        let delivered = self.device.read_into(dest, self.pos)?;
        self.pos += delivered as u64;
        Ok(delivered)
    }

    /// Write at the cursor, advancing it by the bytes stored
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.write_from(data)
    }

    pub fn write_from<S: Source + ?Sized>(&mut self, src: &S) -> Result<usize> {
        let written = self.device.write_from(src, self.pos)?;
        self.pos += written as u64;
        Ok(written)
    }

    /// Write all of `data`, one quantum-bounded call at a time
    pub fn write_all(&mut self, mut data: &[u8]) -> Result<usize> {
        let mut total = 0;
        while !data.is_empty() {
            let written = self.write(data)?;
            if written == 0 {
                break;
            }
            data = &data[written..];
            total += written;
        }
        Ok(total)
    }

    /// Read from the cursor until a call returns zero bytes
    ///
    /// Stops at the end of data or at the first hole.
    pub fn read_to_end(&mut self) -> Result<Bytes> {
        let data = self.device.read_to_end_at(self.pos)?;
        self.pos += data.len() as u64;
        Ok(data)
    }

    /// Move the cursor; `End` is relative to the device size
    pub fn seek(&mut self, target: SeekFrom) -> Result<u64> {
        let (base, delta) = match target {
            SeekFrom::Start(offset) => {
                self.pos = offset;
                return Ok(offset);
            }
            SeekFrom::Current(delta) => (self.pos, delta),
            SeekFrom::End(delta) => (self.device.size(), delta),
        };

        let pos = base
            .checked_add_signed(delta)
            .ok_or_else(|| QdevError::InvalidArgument(format!("seek to {} + {}", base, delta)))?;
        self.pos = pos;
        Ok(pos)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current cursor offset
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_inner();
    }
}

//! Proc entry
//!
//! A small text file living next to the devices. It reads back an initial
//! word until something is written, then the last written message.

use parking_lot::Mutex;

use crate::error::{QdevError, Result};

/// Largest accepted write is `MAX_MESSAGE - 1` bytes
pub const MAX_MESSAGE: usize = 128;

/// Text shown before the first write
pub const DEFAULT_INIT_WORD: &str = "file is empty\n";

/// Single-message text entry
#[derive(Debug)]
pub struct ProcEntry {
    init_word: String,
    content: Mutex<Option<String>>,
}

impl ProcEntry {
    pub fn new(init_word: impl Into<String>) -> Self {
        Self {
            init_word: init_word.into(),
            content: Mutex::new(None),
        }
    }

    /// Read the current text starting at `pos`
    pub fn read_at(&self, buf: &mut [u8], pos: u64) -> usize {
        let content = self.content.lock();
        let text = content.as_deref().unwrap_or(&self.init_word).as_bytes();

        let Ok(start) = usize::try_from(pos) else {
            return 0;
        };
        if start >= text.len() {
            return 0;
        }

        let n = buf.len().min(text.len() - start);
        buf[..n].copy_from_slice(&text[start..start + n]);
        n
    }

    /// Replace the message
    ///
    /// Messages of `MAX_MESSAGE` bytes or more are rejected.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if data.len() >= MAX_MESSAGE {
            return Err(QdevError::InvalidArgument(format!(
                "message of {} bytes exceeds {} byte limit",
                data.len(),
                MAX_MESSAGE - 1
            )));
        }

        let text = String::from_utf8_lossy(data).into_owned();
        *self.content.lock() = Some(text);

        Ok(data.len())
    }

    /// Current text (initial word when nothing was written)
    pub fn contents(&self) -> String {
        self.content
            .lock()
            .clone()
            .unwrap_or_else(|| self.init_word.clone())
    }
}

impl Default for ProcEntry {
    fn default() -> Self {
        Self::new(DEFAULT_INIT_WORD)
    }
}

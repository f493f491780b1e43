//! Caller buffers
//!
//! The seam between device storage and the caller's memory. Reads deliver
//! into a [`Sink`], writes take bytes from a [`Source`]. Plain slices never
//! fault; glue layers backed by foreign memory implement these traits and
//! report what they could not copy.

use crate::error::{QdevError, Result};

/// Destination of a read
pub trait Sink {
    /// Bytes the caller asked for
    fn capacity(&self) -> usize;

    /// Copy `src` to the start of the caller's buffer
    ///
    /// Returns how many leading bytes were actually delivered; anything
    /// less than `src.len()` is a partial fault.
    fn deliver(&mut self, src: &[u8]) -> usize;
}

/// Origin of a write
pub trait Source {
    /// Bytes the caller offered
    fn len(&self) -> usize;

    /// Borrow the first `len` bytes, or fail with `AccessFault`
    ///
    /// A source either yields the whole prefix or nothing.
    fn fetch(&self, len: usize) -> Result<&[u8]>;
}

impl Sink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn deliver(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.len());
        self[..n].copy_from_slice(&src[..n]);
        n
    }
}

impl Source for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn fetch(&self, len: usize) -> Result<&[u8]> {
        self.get(..len).ok_or(QdevError::AccessFault)
    }
}

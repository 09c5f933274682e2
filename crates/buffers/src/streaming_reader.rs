//! Streaming reader with internal buffer management.

use crate::{BufferError, Reader};

/// Read prefix length below which [`StreamingReader::consume`] leaves the
/// buffer in place.
pub const COMPACT_THRESHOLD: usize = 4 * 1024;

/// Accumulates bytes pushed in arbitrary chunks and hands them out in order.
///
/// A decoder peeks at [`StreamingReader::remaining`], and once it knows a
/// whole unit is present it advances with [`StreamingReader::skip`] or
/// [`StreamingReader::buf`]. [`StreamingReader::consume`] drops the bytes
/// already read so the buffer does not grow without bound.
#[derive(Debug, Clone, Default)]
pub struct StreamingReader {
    uint8: Vec<u8>,
    /// Read cursor into `uint8`.
    x: usize,
}

impl StreamingReader {
    /// Creates an empty reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty reader with room for `alloc_size` bytes.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(alloc_size),
            x: 0,
        }
    }

    /// Returns the number of bytes remaining to be read.
    pub fn size(&self) -> usize {
        self.uint8.len() - self.x
    }

    /// Appends a chunk of data.
    pub fn push(&mut self, data: &[u8]) {
        self.uint8.extend_from_slice(data);
    }

    /// Unread bytes.
    pub fn remaining(&self) -> &[u8] {
        &self.uint8[self.x..]
    }

    /// A bounds-checked [`Reader`] over the unread bytes.
    pub fn reader(&self) -> Reader<'_> {
        Reader::new(self.remaining())
    }

    /// Skips the given number of bytes.
    pub fn skip(&mut self, length: usize) -> Result<(), BufferError> {
        let available = self.size();
        if length > available {
            return Err(BufferError::EndOfBuffer {
                needed: length,
                available,
            });
        }
        self.x += length;
        Ok(())
    }

    /// Reads `size` bytes into a new vector.
    pub fn buf(&mut self, size: usize) -> Result<Vec<u8>, BufferError> {
        let x = self.x;
        self.skip(size)?;
        Ok(self.uint8[x..x + size].to_vec())
    }

    /// Releases the bytes already read.
    ///
    /// A fully read buffer is cleared at once. Otherwise the unread tail is
    /// moved to the front only when the read prefix is at least
    /// [`COMPACT_THRESHOLD`] bytes and no shorter than the tail, so each byte
    /// is moved a bounded number of times.
    pub fn consume(&mut self) {
        if self.x == 0 {
            return;
        }
        if self.x == self.uint8.len() {
            self.clear();
            return;
        }
        if self.x >= COMPACT_THRESHOLD && self.x >= self.size() {
            self.uint8.drain(..self.x);
            self.x = 0;
        }
    }

    /// Drops everything, read or not.
    pub fn clear(&mut self) {
        self.uint8.clear();
        self.x = 0;
    }
}

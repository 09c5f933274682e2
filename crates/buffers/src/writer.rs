//! Auto-growing binary writer.

/// Writes binary data into an internal buffer that grows on demand.
///
/// Bytes accumulate in front of the write cursor `x`. [`Writer::flush`]
/// hands them out and rewinds the cursor.
///
/// # Example
///
/// ```
/// use wsframe_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u16(0x03e8);
/// writer.utf8("bye");
/// assert_eq!(writer.flush(), vec![0x03, 0xe8, b'b', b'y', b'e']);
/// assert!(writer.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Writer {
    /// Backing storage.
    pub uint8: Vec<u8>,
    /// Write cursor.
    pub x: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a writer with a 64 KiB initial allocation.
    pub fn new() -> Self {
        Self::with_alloc_size(64 * 1024)
    }

    /// Creates a writer with a custom initial allocation.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(alloc_size),
            x: 0,
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.x
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Makes room for `capacity` more bytes after the cursor.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let end = self.x + capacity;
        if self.uint8.len() < end {
            self.uint8.resize(end, 0);
        }
    }

    /// Pending bytes without flushing.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8[..self.x]
    }

    /// Returns the pending bytes and rewinds the cursor.
    pub fn flush(&mut self) -> Vec<u8> {
        let out = self.uint8[..self.x].to_vec();
        self.reset();
        out
    }

    /// Drops pending bytes and rewinds to the start of the storage.
    pub fn reset(&mut self) {
        self.uint8.clear();
        self.x = 0;
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    /// Writes an unsigned 16-bit integer (big-endian).
    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.buf(&val.to_be_bytes());
    }

    /// Writes an unsigned 32-bit integer (big-endian).
    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.buf(&val.to_be_bytes());
    }

    /// Writes an unsigned 64-bit integer (big-endian).
    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.buf(&val.to_be_bytes());
    }

    /// Copies raw bytes.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Writes the UTF-8 bytes of `s`.
    pub fn utf8(&mut self, s: &str) {
        self.buf(s.as_bytes());
    }

    /// Reserves `length` bytes and returns them for in-place writing.
    pub fn reserve_mut(&mut self, length: usize) -> &mut [u8] {
        self.ensure_capacity(length);
        let x = self.x;
        self.x += length;
        &mut self.uint8[x..x + length]
    }
}

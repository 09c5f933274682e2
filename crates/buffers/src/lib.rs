//! Byte buffer utilities for wsframe.
//!
//! Wire codecs need three things from a buffer layer: a cursor that reports
//! truncation instead of panicking, a growable sink for big-endian fields, and
//! an accumulator for bytes that arrive in arbitrary chunks.
//!
//! # Overview
//!
//! - [`Reader`] - Bounds-checked cursor over a byte slice
//! - [`Writer`] - Auto-growing output buffer
//! - [`StreamingReader`] - Accumulates pushed chunks and releases consumed bytes
//! - [`print_octets`] - Hex dump helper for log lines
//!
//! # Example
//!
//! ```
//! use wsframe_buffers::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.u8(0x81);
//! writer.u16(0x0203);
//! writer.buf(b"hi");
//! let data = writer.flush();
//!
//! let mut reader = Reader::new(&data);
//! assert_eq!(reader.u8().unwrap(), 0x81);
//! assert_eq!(reader.u16().unwrap(), 0x0203);
//! assert_eq!(reader.buf(2).unwrap(), b"hi");
//! assert!(reader.u8().is_err());
//! ```

mod print_octets;
mod reader;
mod streaming_reader;
mod writer;

pub use print_octets::{print_octets, print_octets_default};
pub use reader::Reader;
pub use streaming_reader::{StreamingReader, COMPACT_THRESHOLD};
pub use writer::Writer;

/// Error type for buffer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    EndOfBuffer {
        /// Bytes the read needed.
        needed: usize,
        /// Bytes that were available.
        available: usize,
    },
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::EndOfBuffer { needed, available } => {
                write!(f, "end of buffer: needed {needed} bytes, {available} available")
            }
        }
    }
}

impl std::error::Error for BufferError {}

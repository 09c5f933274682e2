//! Frame header parsing (RFC 6455 §5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+ - - - - - - - - - - - - - - - +
//! |     Extended payload length continued, if payload len == 127  |
//! + - - - - - - - - - - - - - - - +-------------------------------+
//! |                               |Masking-key, if MASK set to 1  |
//! +-------------------------------+-------------------------------+
//! | Masking-key (continued)       |          Payload Data         |
//! +-------------------------------- - - - - - - - - - - - - - - - +
//! ```

use std::borrow::Cow;

use wsframe_buffers::Reader;

use crate::error::WsError;
use crate::mask::{apply_mask, MaskingKey};
use crate::opcode::Opcode;
use crate::MAX_CONTROL_PAYLOAD;

const FIN_BIT: u8 = 0x80;
const RSV1_BIT: u8 = 0x40;
const RSV2_BIT: u8 = 0x20;
const RSV3_BIT: u8 = 0x10;
const MASK_BIT: u8 = 0x80;

/// 7-bit length value announcing a 16-bit extended length.
pub(crate) const LEN16_MARKER: u8 = 126;
/// 7-bit length value announcing a 64-bit extended length.
pub(crate) const LEN64_MARKER: u8 = 127;

/// Decoded frame header.
///
/// `payload_length` is the declared length and says nothing about how much
/// payload has arrived. The header also remembers how many bytes it occupied,
/// see [`FrameHeader::payload_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: Opcode,
    pub payload_length: u64,
    /// Present iff the MASK bit was set.
    pub masking_key: Option<MaskingKey>,
    header_len: usize,
}

impl FrameHeader {
    /// Parses a frame header from the start of `buf`.
    ///
    /// Fails only with [`WsError::IncompleteFrame`], meaning the header is not
    /// fully buffered yet. Protocol rules (reserved bits, control frame
    /// limits) are checked separately by [`FrameHeader::validate`].
    pub fn parse(buf: &[u8]) -> Result<Self, WsError> {
        let mut reader = Reader::new(buf);
        let b0 = reader.u8()?;
        let b1 = reader.u8()?;

        let payload_length = match b1 & 0x7f {
            LEN16_MARKER => u64::from(reader.u16()?),
            LEN64_MARKER => reader.u64()?,
            len => u64::from(len),
        };
        let masking_key = if b1 & MASK_BIT != 0 {
            Some(reader.array::<4>()?)
        } else {
            None
        };

        Ok(Self {
            fin: b0 & FIN_BIT != 0,
            rsv1: b0 & RSV1_BIT != 0,
            rsv2: b0 & RSV2_BIT != 0,
            rsv3: b0 & RSV3_BIT != 0,
            opcode: Opcode::from_bits(b0),
            payload_length,
            masking_key,
            header_len: reader.x,
        })
    }

    /// Header size on the wire for a payload of `payload_len` bytes:
    /// 2, plus 2 or 8 extended length bytes, plus 4 when masked.
    pub const fn encoded_len(payload_len: u64, masked: bool) -> usize {
        let ext = if payload_len < LEN16_MARKER as u64 {
            0
        } else if payload_len <= u16::MAX as u64 {
            2
        } else {
            8
        };
        2 + ext + if masked { 4 } else { 0 }
    }

    pub const fn masked(&self) -> bool {
        self.masking_key.is_some()
    }

    /// Byte offset at which the payload starts.
    pub const fn payload_offset(&self) -> usize {
        self.header_len
    }

    /// Header plus declared payload, or `None` if it does not fit in `usize`.
    pub fn frame_len(&self) -> Option<usize> {
        usize::try_from(self.payload_length)
            .ok()
            .and_then(|len| len.checked_add(self.header_len))
    }

    /// Checks the rules every frame must follow when no extension has been
    /// negotiated: RSV bits clear, control frames unfragmented and at most 125
    /// bytes.
    pub fn validate(&self) -> Result<(), WsError> {
        if self.rsv1 || self.rsv2 || self.rsv3 {
            return Err(WsError::ReservedBitsSet);
        }
        if self.opcode.is_control() {
            if !self.fin {
                return Err(WsError::FragmentedControlFrame);
            }
            if self.payload_length > MAX_CONTROL_PAYLOAD as u64 {
                return Err(WsError::ControlFramePayloadTooLarge(
                    self.payload_length as usize,
                ));
            }
        }
        Ok(())
    }
}

/// A frame fully present in a buffer: header plus borrowed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame<'a> {
    pub header: FrameHeader,
    /// Payload as it appeared on the wire (still masked if the header says so).
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Payload with the mask removed. Borrows when the frame was not masked.
    pub fn unmasked_payload(&self) -> Cow<'a, [u8]> {
        match self.header.masking_key {
            None => Cow::Borrowed(self.payload),
            Some(key) => {
                let mut owned = self.payload.to_vec();
                apply_mask(&mut owned, key);
                Cow::Owned(owned)
            }
        }
    }

    /// Bytes this frame occupied in the input buffer.
    pub fn wire_len(&self) -> usize {
        self.header.payload_offset() + self.payload.len()
    }
}

/// Parses one complete frame from the start of `buf`.
///
/// Returns [`WsError::IncompleteFrame`] until both header and declared
/// payload are buffered.
pub fn parse_frame(buf: &[u8]) -> Result<Frame<'_>, WsError> {
    let header = FrameHeader::parse(buf)?;
    let end = header.frame_len().ok_or(WsError::PayloadTooLarge {
        len: header.payload_length,
        max: usize::MAX as u64,
    })?;
    if buf.len() < end {
        return Err(WsError::IncompleteFrame);
    }
    Ok(Frame {
        header,
        payload: &buf[header.payload_offset()..end],
    })
}

/// A decoded frame that owns its unmasked payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedFrame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

impl From<Frame<'_>> for OwnedFrame {
    fn from(frame: Frame<'_>) -> Self {
        Self {
            payload: frame.unmasked_payload().into_owned(),
            header: frame.header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unmasked_hello() {
        let buf = [0x81, 0x05, b'H', b'e', b'l', b'l', b'o'];
        let header = FrameHeader::parse(&buf).unwrap();
        assert!(header.fin);
        assert!(!header.rsv1 && !header.rsv2 && !header.rsv3);
        assert_eq!(header.opcode, Opcode::Text);
        assert!(!header.masked());
        assert_eq!(header.payload_length, 5);
        assert_eq!(header.payload_offset(), 2);

        let frame = parse_frame(&buf).unwrap();
        assert_eq!(frame.payload, b"Hello");
        assert_eq!(frame.wire_len(), 7);
    }

    #[test]
    fn parses_masked_hello() {
        let buf = [
            0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
        ];
        let frame = parse_frame(&buf).unwrap();
        assert_eq!(frame.header.masking_key, Some([0x37, 0xfa, 0x21, 0x3d]));
        assert_eq!(frame.header.payload_offset(), 6);
        assert_eq!(&*frame.unmasked_payload(), b"Hello");
    }

    #[test]
    fn reads_extended_lengths() {
        let header = FrameHeader::parse(&[0x82, 0x7e, 0x01, 0x00]).unwrap();
        assert_eq!(header.payload_length, 256);
        assert_eq!(header.payload_offset(), 4);

        let header = FrameHeader::parse(&[0x82, 0x7f, 0, 0, 0, 0, 0, 1, 0, 0]).unwrap();
        assert_eq!(header.payload_length, 65536);
        assert_eq!(header.payload_offset(), 10);

        let header = FrameHeader::parse(&[0x82, 0xfe, 0x00, 0x80, 1, 2, 3, 4]).unwrap();
        assert_eq!(header.payload_length, 128);
        assert_eq!(header.payload_offset(), 8);
    }

    #[test]
    fn truncation_is_incomplete() {
        let cases: [&[u8]; 6] = [
            &[],
            &[0x81],
            &[0x82, 0x7e, 0x01],
            &[0x82, 0x7f, 0, 0, 0, 0, 0, 1, 0],
            &[0x81, 0x85, 0x37, 0xfa, 0x21],
            &[0x82, 0xfe, 0x00, 0x80],
        ];
        for buf in cases {
            assert_eq!(FrameHeader::parse(buf), Err(WsError::IncompleteFrame));
        }
        assert_eq!(
            parse_frame(&[0x81, 0x05, b'H', b'e']),
            Err(WsError::IncompleteFrame)
        );
    }

    #[test]
    fn reserved_opcodes_parse() {
        let header = FrameHeader::parse(&[0x83, 0x00]).unwrap();
        assert_eq!(header.opcode, Opcode::Unrecognized(3));
        let header = FrameHeader::parse(&[0x8f, 0x00]).unwrap();
        assert_eq!(header.opcode, Opcode::Unrecognized(15));
    }

    #[test]
    fn encoded_len_thresholds() {
        assert_eq!(FrameHeader::encoded_len(0, false), 2);
        assert_eq!(FrameHeader::encoded_len(125, false), 2);
        assert_eq!(FrameHeader::encoded_len(126, false), 4);
        assert_eq!(FrameHeader::encoded_len(65535, false), 4);
        assert_eq!(FrameHeader::encoded_len(65536, false), 10);
        assert_eq!(FrameHeader::encoded_len(65536, true), 14);
    }

    #[test]
    fn validate_rules() {
        let rsv = FrameHeader::parse(&[0xc1, 0x00]).unwrap();
        assert_eq!(rsv.validate(), Err(WsError::ReservedBitsSet));

        let fragmented_ping = FrameHeader::parse(&[0x09, 0x00]).unwrap();
        assert_eq!(
            fragmented_ping.validate(),
            Err(WsError::FragmentedControlFrame)
        );

        let big_ping = FrameHeader::parse(&[0x89, 0x7e, 0x00, 0x7e]).unwrap();
        assert_eq!(
            big_ping.validate(),
            Err(WsError::ControlFramePayloadTooLarge(126))
        );

        let ok_ping = FrameHeader::parse(&[0x89, 0x7d]).unwrap();
        assert_eq!(ok_ping.validate(), Ok(()));
    }
}

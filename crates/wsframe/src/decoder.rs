//! Streaming frame decoder.

use tracing::{trace, warn};
use wsframe_buffers::{print_octets_default, StreamingReader};

use crate::builder::Role;
use crate::error::WsError;
use crate::frame::{parse_frame, FrameHeader, OwnedFrame};

/// Turns a byte stream into frames.
///
/// Bytes are pushed in whatever chunks the transport delivers; each call to
/// [`FrameDecoder::next_frame`] yields at most one complete frame with its
/// payload already unmasked. The decoder is built for one side of the
/// connection and enforces the masking direction for that side.
///
/// Errors leave the offending bytes buffered. There is no resynchronization:
/// after an error the stream is unusable and the connection must close.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    role: Role,
    max_frame_size: u64,
    reader: StreamingReader,
}

impl FrameDecoder {
    pub fn new(role: Role, max_frame_size: u64) -> Self {
        Self {
            role,
            max_frame_size,
            reader: StreamingReader::with_alloc_size(4 * 1024),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.reader.size()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.reader.push(data);
    }

    /// Drops all buffered bytes.
    pub fn clear(&mut self) {
        self.reader.clear();
    }

    /// Decodes the next frame, or `Ok(None)` if it has not fully arrived.
    pub fn next_frame(&mut self) -> Result<Option<OwnedFrame>, WsError> {
        let header = match FrameHeader::parse(self.reader.remaining()) {
            Ok(header) => header,
            Err(WsError::IncompleteFrame) => return Ok(None),
            Err(err) => return Err(err),
        };
        if let Err(err) = self.check(&header) {
            warn!(
                %err,
                head = %print_octets_default(self.reader.remaining()),
                "rejecting inbound frame"
            );
            return Err(err);
        }

        let frame = match parse_frame(self.reader.remaining()) {
            Ok(frame) => frame,
            Err(WsError::IncompleteFrame) => return Ok(None),
            Err(err) => return Err(err),
        };
        let wire_len = frame.wire_len();
        let frame = OwnedFrame::from(frame);
        self.reader.skip(wire_len)?;
        self.reader.consume();

        trace!(
            opcode = ?frame.header.opcode,
            fin = frame.header.fin,
            length = frame.payload.len(),
            "decoded frame"
        );
        Ok(Some(frame))
    }

    fn check(&self, header: &FrameHeader) -> Result<(), WsError> {
        header.validate()?;
        match (self.role.expects_masked_inbound(), header.masked()) {
            (true, false) => return Err(WsError::MaskRequired),
            (false, true) => return Err(WsError::UnexpectedMask),
            _ => {}
        }
        if header.payload_length > self.max_frame_size {
            return Err(WsError::PayloadTooLarge {
                len: header.payload_length,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FrameBuilder;
    use crate::opcode::Opcode;

    #[test]
    fn byte_at_a_time() {
        let mut builder = FrameBuilder::client();
        builder.text("Hello").ping(b"p").unwrap();
        let bytes = builder.build();

        let mut decoder = FrameDecoder::new(Role::Server, 1024);
        let mut frames = Vec::new();
        for byte in &bytes {
            decoder.push(std::slice::from_ref(byte));
            while let Some(frame) = decoder.next_frame().unwrap() {
                frames.push(frame);
            }
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].header.opcode, Opcode::Text);
        assert_eq!(frames[0].payload, b"Hello");
        assert_eq!(frames[1].header.opcode, Opcode::Ping);
        assert_eq!(frames[1].payload, b"p");
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn masking_direction() {
        let mut server = FrameDecoder::new(Role::Server, 1024);
        server.push(&[0x81, 0x00]);
        assert_eq!(server.next_frame(), Err(WsError::MaskRequired));

        let mut client = FrameDecoder::new(Role::Client, 1024);
        client.push(&[0x81, 0x80, 1, 2, 3, 4]);
        assert_eq!(client.next_frame(), Err(WsError::UnexpectedMask));
    }

    #[test]
    fn declared_length_limit_checked_before_payload_arrives() {
        let mut decoder = FrameDecoder::new(Role::Client, 100);
        decoder.push(&[0x82, 0x7e, 0x01, 0x00]);
        assert_eq!(
            decoder.next_frame(),
            Err(WsError::PayloadTooLarge { len: 256, max: 100 })
        );
    }

    #[test]
    fn protocol_violations() {
        let mut decoder = FrameDecoder::new(Role::Client, 1024);
        decoder.push(&[0xc1, 0x00]);
        assert_eq!(decoder.next_frame(), Err(WsError::ReservedBitsSet));

        let mut decoder = FrameDecoder::new(Role::Client, 1024);
        decoder.push(&[0x89, 0x7e, 0x00, 0x7e]);
        assert_eq!(
            decoder.next_frame(),
            Err(WsError::ControlFramePayloadTooLarge(126))
        );
    }

    #[test]
    fn unrecognized_opcodes_pass_through() {
        let mut decoder = FrameDecoder::new(Role::Client, 1024);
        decoder.push(&[0x83, 0x01, 0xaa]);
        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.header.opcode, Opcode::Unrecognized(3));
        assert_eq!(decoder.next_frame(), Ok(None));
    }
}

//! Frame encoder.

use tracing::trace;
use wsframe_buffers::{print_octets_default, Writer};

use crate::close::{close_payload, CloseCode};
use crate::error::WsError;
use crate::fragment::fragment_frames;
use crate::frame::{FrameHeader, LEN16_MARKER, LEN64_MARKER};
use crate::mask::{apply_mask, random_mask_key};
use crate::opcode::Opcode;
use crate::MAX_CONTROL_PAYLOAD;

/// Which end of the connection this endpoint is.
///
/// Clients mask every frame with a fresh key; servers never mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    /// Whether frames sent by this role carry a masking key.
    pub const fn masks_outbound(self) -> bool {
        matches!(self, Role::Client)
    }

    /// Whether frames received by this role must carry a masking key.
    pub const fn expects_masked_inbound(self) -> bool {
        matches!(self, Role::Server)
    }
}

/// Accumulates encoded frames.
///
/// Each call appends one frame (or a fragment sequence for
/// [`FrameBuilder::message`]); [`FrameBuilder::build`] returns everything
/// written so far.
///
/// # Example
///
/// ```
/// use wsframe::FrameBuilder;
///
/// let mut builder = FrameBuilder::server();
/// builder.text("Hello");
/// assert_eq!(builder.build(), vec![0x81, 0x05, b'H', b'e', b'l', b'l', b'o']);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    role: Role,
    writer: Writer,
}

impl FrameBuilder {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            writer: Writer::with_alloc_size(4 * 1024),
        }
    }

    /// Builder for client-to-server frames (masked).
    pub fn client() -> Self {
        Self::new(Role::Client)
    }

    /// Builder for server-to-client frames (never masked).
    pub fn server() -> Self {
        Self::new(Role::Server)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Bytes accumulated since the last [`FrameBuilder::build`].
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    /// Takes the accumulated bytes, leaving the builder empty.
    pub fn build(&mut self) -> Vec<u8> {
        self.writer.flush()
    }

    pub fn text(&mut self, message: &str) -> &mut Self {
        self.write_unchecked(Opcode::Text, true, message.as_bytes());
        self
    }

    pub fn binary(&mut self, data: &[u8]) -> &mut Self {
        self.write_unchecked(Opcode::Binary, true, data);
        self
    }

    pub fn ping(&mut self, data: &[u8]) -> Result<&mut Self, WsError> {
        self.write_frame(Opcode::Ping, true, data)
    }

    pub fn pong(&mut self, data: &[u8]) -> Result<&mut Self, WsError> {
        self.write_frame(Opcode::Pong, true, data)
    }

    /// Close frame with a status code and UTF-8 reason.
    ///
    /// Fails if `code` may not be sent or the payload would exceed 125 bytes.
    pub fn close(
        &mut self,
        code: impl Into<CloseCode>,
        reason: &str,
    ) -> Result<&mut Self, WsError> {
        let code = code.into();
        if !code.is_sendable() {
            return Err(WsError::InvalidCloseCode(code.as_u16()));
        }
        let payload = close_payload(code.as_u16(), reason);
        self.write_frame(Opcode::Close, true, &payload)
    }

    /// Close frame with an empty payload.
    pub fn close_empty(&mut self) -> &mut Self {
        self.write_unchecked(Opcode::Close, true, &[]);
        self
    }

    /// Writes a data message, split into frames of at most `max_frame_size`
    /// payload bytes.
    pub fn message(
        &mut self,
        opcode: Opcode,
        data: &[u8],
        max_frame_size: usize,
    ) -> Result<&mut Self, WsError> {
        for fragment in fragment_frames(opcode, data, max_frame_size)? {
            self.write_unchecked(fragment.opcode, fragment.fin, fragment.payload);
        }
        Ok(self)
    }

    /// Writes one frame.
    ///
    /// Control frames must have `fin` set and at most 125 payload bytes;
    /// nothing is written when either rule is broken.
    pub fn write_frame(
        &mut self,
        opcode: Opcode,
        fin: bool,
        payload: &[u8],
    ) -> Result<&mut Self, WsError> {
        if opcode.is_control() {
            if payload.len() > MAX_CONTROL_PAYLOAD {
                return Err(WsError::ControlFramePayloadTooLarge(payload.len()));
            }
            if !fin {
                return Err(WsError::FragmentedControlFrame);
            }
        }
        self.write_unchecked(opcode, fin, payload);
        Ok(self)
    }

    fn write_unchecked(&mut self, opcode: Opcode, fin: bool, payload: &[u8]) {
        let start = self.writer.len();
        let length = payload.len();
        let masked = self.role.masks_outbound();
        let mask_bit: u8 = if masked { 0x80 } else { 0x00 };

        self.writer.u8(((fin as u8) << 7) | opcode.bits());
        if length < LEN16_MARKER as usize {
            self.writer.u8(mask_bit | length as u8);
        } else if length <= u16::MAX as usize {
            self.writer.u8(mask_bit | LEN16_MARKER);
            self.writer.u16(length as u16);
        } else {
            self.writer.u8(mask_bit | LEN64_MARKER);
            self.writer.u64(length as u64);
        }

        if masked {
            let key = random_mask_key();
            self.writer.buf(&key);
            let dst = self.writer.reserve_mut(length);
            dst.copy_from_slice(payload);
            apply_mask(dst, key);
        } else {
            self.writer.buf(payload);
        }

        debug_assert_eq!(
            self.writer.len() - start,
            FrameHeader::encoded_len(length as u64, masked) + length
        );
        trace!(
            ?opcode,
            fin,
            masked,
            length,
            head = %print_octets_default(&self.writer.as_slice()[start..]),
            "encoded frame"
        );
    }
}

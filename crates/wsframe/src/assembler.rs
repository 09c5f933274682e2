//! Reassembly of fragmented data messages.

use tracing::trace;

use crate::error::WsError;
use crate::frame::OwnedFrame;
use crate::opcode::Opcode;

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    pub fn opcode(&self) -> Opcode {
        match self {
            Message::Text(_) => Opcode::Text,
            Message::Binary(_) => Opcode::Binary,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Message::Text(text) => text.as_bytes(),
            Message::Binary(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

#[derive(Debug, Clone)]
struct Partial {
    opcode: Opcode,
    data: Vec<u8>,
}

/// Folds data frames into messages.
///
/// Control frames may arrive between fragments and are not this type's
/// business; only text, binary and continuation frames are fed in.
#[derive(Debug, Clone)]
pub struct MessageAssembler {
    max_message_size: usize,
    partial: Option<Partial>,
}

impl MessageAssembler {
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            partial: None,
        }
    }

    /// True while a fragmented message is waiting for its final frame.
    pub fn in_progress(&self) -> bool {
        self.partial.is_some()
    }

    /// Discards any partial message.
    pub fn reset(&mut self) {
        self.partial = None;
    }

    /// Feeds one data frame. Returns the message once its final frame is in.
    pub fn push(&mut self, frame: OwnedFrame) -> Result<Option<Message>, WsError> {
        let OwnedFrame { header, payload } = frame;
        let mut partial = match (header.opcode, self.partial.take()) {
            (Opcode::Continuation, Some(mut partial)) => {
                self.check_size(partial.data.len(), payload.len())?;
                partial.data.extend_from_slice(&payload);
                partial
            }
            (Opcode::Continuation, None) => return Err(WsError::UnexpectedContinuation),
            (Opcode::Text | Opcode::Binary, Some(_)) => return Err(WsError::MessageInterrupted),
            (opcode @ (Opcode::Text | Opcode::Binary), None) => {
                self.check_size(0, payload.len())?;
                Partial {
                    opcode,
                    data: payload,
                }
            }
            (opcode, _) => return Err(WsError::UnrecognizedOpcode(opcode.bits())),
        };

        if !header.fin {
            trace!(buffered = partial.data.len(), "message fragment buffered");
            self.partial = Some(partial);
            return Ok(None);
        }

        let data = std::mem::take(&mut partial.data);
        let message = match partial.opcode {
            Opcode::Text => {
                Message::Text(String::from_utf8(data).map_err(|_| WsError::InvalidUtf8)?)
            }
            _ => Message::Binary(data),
        };
        Ok(Some(message))
    }

    fn check_size(&self, have: usize, more: usize) -> Result<(), WsError> {
        let total = have.saturating_add(more);
        if total > self.max_message_size {
            return Err(WsError::PayloadTooLarge {
                len: total as u64,
                max: self.max_message_size as u64,
            });
        }
        Ok(())
    }
}

//! Error types for framing, handshake and connection lifecycle.

use thiserror::Error;
use wsframe_buffers::BufferError;

use crate::close::CloseCode;
use crate::state::ConnectionState;

/// Why the server's handshake response was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeRejection {
    #[error("expected status 101, got {0}")]
    NotSwitchingProtocols(u16),
    #[error("Sec-WebSocket-Accept header missing")]
    MissingAcceptKey,
    #[error("Sec-WebSocket-Accept mismatch: expected {expected}, got {actual}")]
    AcceptKeyMismatch { expected: String, actual: String },
    #[error("server selected subprotocol {0:?} which was not offered")]
    UnexpectedSubprotocol(String),
}

/// Error type for every framing operation.
///
/// Only [`WsError::IncompleteFrame`] is recoverable: the caller buffers more
/// bytes and parses again. Everything a peer can cause maps to a close code
/// through [`WsError::close_code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WsError {
    #[error("incomplete frame: more bytes required")]
    IncompleteFrame,
    #[error("control frame payload of {0} bytes exceeds 125")]
    ControlFramePayloadTooLarge(usize),
    #[error("control frame must not be fragmented")]
    FragmentedControlFrame,
    #[error("reserved bits set without a negotiated extension")]
    ReservedBitsSet,
    #[error("client frame is not masked")]
    MaskRequired,
    #[error("server frame must not be masked")]
    UnexpectedMask,
    #[error("payload of {len} bytes exceeds limit of {max}")]
    PayloadTooLarge { len: u64, max: u64 },
    #[error("continuation frame without a message in progress")]
    UnexpectedContinuation,
    #[error("new data message started before the previous one finished")]
    MessageInterrupted,
    #[error("unrecognized opcode {0:#x}")]
    UnrecognizedOpcode(u8),
    #[error("invalid UTF-8 in text payload")]
    InvalidUtf8,
    #[error("close payload must be empty or at least 2 bytes")]
    InvalidClosePayload,
    #[error("close code {0} is not allowed on the wire")]
    InvalidCloseCode(u16),
    #[error("max frame size must be greater than zero")]
    InvalidFragmentSize,
    #[error("handshake rejected: {0}")]
    HandshakeRejected(#[from] HandshakeRejection),
    #[error("incomplete handshake: blank line not received yet")]
    IncompleteHandshake,
    #[error("invalid handshake: {0}")]
    InvalidHandshake(String),
    #[error("connection is closed")]
    ConnectionClosed,
    #[error("cannot send in state {0:?}")]
    NotOpen(ConnectionState),
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
}

impl WsError {
    /// `true` for errors that only mean "wait for more bytes".
    pub fn is_incomplete(&self) -> bool {
        matches!(self, WsError::IncompleteFrame | WsError::IncompleteHandshake)
    }

    /// The close code a connection sends after hitting this error on inbound
    /// data.
    pub fn close_code(&self) -> CloseCode {
        match self {
            WsError::PayloadTooLarge { .. } => CloseCode::MessageTooBig,
            WsError::InvalidUtf8 => CloseCode::InvalidFrame,
            WsError::ConnectionClosed
            | WsError::NotOpen(_)
            | WsError::InvalidTransition { .. }
            | WsError::InvalidFragmentSize => CloseCode::InternalError,
            _ => CloseCode::ProtocolError,
        }
    }
}

impl From<BufferError> for WsError {
    fn from(_: BufferError) -> Self {
        WsError::IncompleteFrame
    }
}

/// Error type for loading [`crate::WsConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

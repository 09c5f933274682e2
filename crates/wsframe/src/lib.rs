//! WebSocket (RFC 6455) framing.
//!
//! The pieces, bottom up:
//!
//! - [`FrameHeader::parse`] and [`parse_frame`] read frames from a buffer,
//!   reporting [`WsError::IncompleteFrame`] until enough bytes are present.
//! - [`apply_mask`] and friends implement the XOR masking codec.
//! - [`FrameBuilder`] encodes frames, masking them when acting as a client.
//! - [`fragment`] and [`fragment_frames`] split large messages.
//! - [`HandshakeRequest`] and [`HandshakeResponse`] model the opening
//!   handshake, including accept-key derivation and verification.
//! - [`ConnectionState`] and [`PingPongHandler`] track lifecycle and liveness.
//! - [`FrameDecoder`], [`MessageAssembler`] and [`Connection`] tie the above
//!   into a sans-IO endpoint; the caller owns the transport.
//!
//! # Example
//!
//! ```
//! use wsframe::{parse_frame, FrameBuilder, Opcode};
//!
//! let mut builder = FrameBuilder::client();
//! builder.text("Hello");
//! let bytes = builder.build();
//!
//! let frame = parse_frame(&bytes).unwrap();
//! assert_eq!(frame.header.opcode, Opcode::Text);
//! assert!(frame.header.masked());
//! assert_eq!(&*frame.unmasked_payload(), b"Hello");
//! ```

mod assembler;
mod builder;
mod close;
mod config;
mod connection;
mod decoder;
mod error;
mod fragment;
mod frame;
mod handshake;
mod mask;
mod opcode;
mod ping;
mod state;

/// Upper bound on control frame payloads.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

pub use assembler::{Message, MessageAssembler};
pub use builder::{FrameBuilder, Role};
pub use close::{CloseCode, CloseFrame};
pub use config::WsConfig;
pub use connection::{Connection, Event};
pub use decoder::FrameDecoder;
pub use error::{ConfigError, HandshakeRejection, WsError};
pub use fragment::{fragment, fragment_frames, Fragment};
pub use frame::{parse_frame, Frame, FrameHeader, OwnedFrame};
pub use handshake::{
    compute_accept_key, generate_client_key, handshake_head_len, HandshakeRequest,
    HandshakeResponse, WS_GUID, WS_VERSION,
};
pub use mask::{apply_mask, apply_mask_offset, mask, random_mask_key, unmask, MaskingKey};
pub use opcode::Opcode;
pub use ping::PingPongHandler;
pub use state::ConnectionState;

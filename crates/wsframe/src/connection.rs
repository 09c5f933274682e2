//! Sans-IO connection driver.
//!
//! [`Connection`] owns everything one endpoint needs to speak the protocol
//! but never touches a socket. The caller moves bytes:
//!
//! 1. handshake text out and in ([`Connection::start_handshake`] and
//!    [`Connection::accept_response`] on a client,
//!    [`Connection::accept_request`] on a server); bytes read past the
//!    handshake head are kept as frame data,
//! 2. inbound frame bytes in with [`Connection::receive`], then
//!    [`Connection::next_event`] until it returns `Ok(None)`,
//! 3. outbound bytes out with [`Connection::take_outbound`] after every call
//!    that may have queued a frame.

use tracing::{debug, warn};

use crate::assembler::{Message, MessageAssembler};
use crate::builder::{FrameBuilder, Role};
use crate::close::{CloseCode, CloseFrame};
use crate::config::WsConfig;
use crate::decoder::FrameDecoder;
use crate::error::{ConfigError, WsError};
use crate::frame::OwnedFrame;
use crate::handshake::{handshake_head_len, HandshakeRequest, HandshakeResponse};
use crate::opcode::Opcode;
use crate::ping::PingPongHandler;
use crate::state::ConnectionState;
use crate::MAX_CONTROL_PAYLOAD;

/// Something the peer sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(Message),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// The peer's close frame. The reply, if one was owed, is already queued.
    Close(CloseFrame),
}

#[derive(Debug, Clone)]
pub struct Connection {
    role: Role,
    config: WsConfig,
    state: ConnectionState,
    liveness: PingPongHandler,
    builder: FrameBuilder,
    decoder: FrameDecoder,
    assembler: MessageAssembler,
    pending_request: Option<HandshakeRequest>,
    close_sent: bool,
    /// Set after an inbound protocol error; later input is discarded.
    read_failed: bool,
}

impl Connection {
    /// Fails if `config` does not pass [`WsConfig::validate`].
    pub fn new(role: Role, config: WsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            role,
            state: ConnectionState::Connecting,
            liveness: PingPongHandler::new(),
            builder: FrameBuilder::new(role),
            decoder: FrameDecoder::new(role, config.max_frame_size),
            assembler: MessageAssembler::new(config.max_message_size),
            pending_request: None,
            close_sent: false,
            read_failed: false,
            config,
        })
    }

    pub fn client(config: WsConfig) -> Result<Self, ConfigError> {
        Self::new(Role::Client, config)
    }

    pub fn server(config: WsConfig) -> Result<Self, ConfigError> {
        Self::new(Role::Server, config)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    pub fn liveness(&self) -> &PingPongHandler {
        &self.liveness
    }

    /// Client: records `request` and returns the text to send.
    pub fn start_handshake(&mut self, request: HandshakeRequest) -> Result<String, WsError> {
        if self.role != Role::Client {
            return Err(WsError::InvalidHandshake(
                "only clients start a handshake".into(),
            ));
        }
        self.ensure_connecting()?;
        let text = request.build()?;
        debug!(host = %request.host, path = %request.path, "handshake started");
        self.pending_request = Some(request);
        Ok(text)
    }

    /// Client: checks the server's response and opens the connection.
    ///
    /// `bytes` is everything read so far. Returns
    /// [`WsError::IncompleteHandshake`] until the head's blank line is in;
    /// bytes after it are buffered as frames. On any other failure the state
    /// stays `Connecting`; the transport was never upgraded and should simply
    /// be dropped.
    pub fn accept_response(&mut self, bytes: &[u8]) -> Result<(), WsError> {
        self.ensure_connecting()?;
        let request = self
            .pending_request
            .as_ref()
            .ok_or_else(|| WsError::InvalidHandshake("no handshake in progress".into()))?;
        let (head, rest) = split_head(bytes)?;
        HandshakeResponse::parse(head)?.verify(request)?;
        self.pending_request = None;
        self.advance(ConnectionState::Open)?;
        self.decoder.push(rest);
        Ok(())
    }

    /// Server: validates the client's request and opens the connection. The
    /// returned response must be written before any frame.
    ///
    /// `bytes` is handled as in [`Connection::accept_response`].
    pub fn accept_request(&mut self, bytes: &[u8]) -> Result<HandshakeResponse, WsError> {
        if self.role != Role::Server {
            return Err(WsError::InvalidHandshake(
                "only servers accept a handshake request".into(),
            ));
        }
        self.ensure_connecting()?;
        let (head, rest) = split_head(bytes)?;
        let request = HandshakeRequest::parse(head)?;
        let response = HandshakeResponse::accept(&request);
        response.build()?;
        self.advance(ConnectionState::Open)?;
        self.decoder.push(rest);
        Ok(response)
    }

    pub fn send_text(&mut self, text: &str) -> Result<(), WsError> {
        self.send_message(Opcode::Text, text.as_bytes())
    }

    pub fn send_binary(&mut self, data: &[u8]) -> Result<(), WsError> {
        self.send_message(Opcode::Binary, data)
    }

    fn send_message(&mut self, opcode: Opcode, data: &[u8]) -> Result<(), WsError> {
        self.ensure_can_send()?;
        let max = self.config.fragment_size.unwrap_or(usize::MAX);
        self.builder.message(opcode, data, max)?;
        Ok(())
    }

    /// Queues a ping and starts the liveness window at `now`.
    pub fn send_ping(&mut self, payload: &[u8], now: u64) -> Result<(), WsError> {
        self.ensure_can_send()?;
        self.builder.ping(payload)?;
        self.liveness.send_ping(now);
        Ok(())
    }

    pub fn send_pong(&mut self, payload: &[u8]) -> Result<(), WsError> {
        self.ensure_can_send()?;
        self.builder.pong(payload)?;
        Ok(())
    }

    /// Starts the close handshake. A second call while closing is a no-op.
    pub fn close(&mut self, code: impl Into<CloseCode>, reason: &str) -> Result<(), WsError> {
        match self.state {
            ConnectionState::Closed => return Err(WsError::ConnectionClosed),
            ConnectionState::Closing if self.close_sent => return Ok(()),
            ConnectionState::Connecting => return Err(WsError::NotOpen(self.state)),
            _ => {}
        }
        self.builder.close(code, reason)?;
        self.close_sent = true;
        if self.state.is_open() {
            self.advance(ConnectionState::Closing)?;
        }
        Ok(())
    }

    /// Buffers bytes read from the transport.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), WsError> {
        match self.state {
            ConnectionState::Closed => return Err(WsError::ConnectionClosed),
            ConnectionState::Connecting => return Err(WsError::NotOpen(self.state)),
            _ => {}
        }
        if !self.read_failed {
            self.decoder.push(bytes);
        }
        Ok(())
    }

    /// Decodes the next event from buffered bytes, or `Ok(None)` when more
    /// bytes are needed.
    ///
    /// Inbound protocol errors queue a close frame carrying
    /// [`WsError::close_code`] and move the connection to `Closing`; the error
    /// is returned and the rest of the stream is ignored.
    pub fn next_event(&mut self, now: u64) -> Result<Option<Event>, WsError> {
        if self.state.is_closed() {
            return Err(WsError::ConnectionClosed);
        }
        if self.read_failed {
            return Ok(None);
        }
        loop {
            let frame = match self.decoder.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(None),
                Err(err) => return Err(self.fail(err)),
            };
            match self.dispatch(frame, now) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => continue,
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    fn dispatch(&mut self, frame: OwnedFrame, now: u64) -> Result<Option<Event>, WsError> {
        match frame.header.opcode {
            Opcode::Text | Opcode::Binary | Opcode::Continuation => {
                Ok(self.assembler.push(frame)?.map(Event::Message))
            }
            Opcode::Ping => {
                if self.config.auto_pong && !self.close_sent {
                    self.builder.pong(&frame.payload)?;
                }
                Ok(Some(Event::Ping(frame.payload)))
            }
            Opcode::Pong => {
                self.liveness.receive_pong(now);
                Ok(Some(Event::Pong(frame.payload)))
            }
            Opcode::Close => {
                let close = CloseFrame::parse(&frame.payload)?;
                self.on_peer_close(&close)?;
                Ok(Some(Event::Close(close)))
            }
            Opcode::Unrecognized(bits) => Err(WsError::UnrecognizedOpcode(bits)),
        }
    }

    fn on_peer_close(&mut self, close: &CloseFrame) -> Result<(), WsError> {
        debug!(code = close.reported_code().as_u16(), reason = %close.reason, "peer closed");
        if !self.close_sent {
            match close.code {
                Some(code) => self.builder.close(code, "")?,
                None => self.builder.close_empty(),
            };
            self.close_sent = true;
        }
        if self.state.is_open() {
            self.advance(ConnectionState::Closing)?;
        }
        self.advance(ConnectionState::Closed)
    }

    fn fail(&mut self, err: WsError) -> WsError {
        warn!(role = ?self.role, %err, "inbound protocol error");
        self.read_failed = true;
        self.decoder.clear();
        self.assembler.reset();
        if !self.close_sent && self.state.can_send() {
            let reason = truncate_reason(&err.to_string());
            if let Err(close_err) = self.builder.close(err.close_code(), &reason) {
                warn!(%close_err, "could not queue close frame");
            }
            self.close_sent = true;
        }
        if self.state.is_open() {
            if let Err(transition_err) = self.advance(ConnectionState::Closing) {
                warn!(%transition_err, "could not move to closing");
            }
        }
        err
    }

    /// Encoded frames queued since the last call.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        self.builder.build()
    }

    pub fn has_outbound(&self) -> bool {
        !self.builder.is_empty()
    }

    /// Liveness per the configured ping timeout.
    pub fn is_alive(&self, now: u64) -> bool {
        self.liveness.is_alive(now, self.config.ping_timeout_ms)
    }

    /// The transport is gone. Walks forward to `Closed` and drops buffered
    /// input. A connection that never opened stays `Connecting`.
    pub fn transport_closed(&mut self) {
        self.decoder.clear();
        self.assembler.reset();
        self.pending_request = None;
        while self.state != ConnectionState::Connecting {
            let Some(next) = self.state.next() else {
                break;
            };
            if self.advance(next).is_err() {
                break;
            }
        }
    }

    fn advance(&mut self, to: ConnectionState) -> Result<(), WsError> {
        let from = self.state;
        self.state.transition(to)?;
        debug!(role = ?self.role, ?from, ?to, "state transition");
        if to.is_closed() {
            self.decoder.clear();
            self.assembler.reset();
        }
        Ok(())
    }

    fn ensure_connecting(&self) -> Result<(), WsError> {
        match self.state {
            ConnectionState::Connecting => Ok(()),
            ConnectionState::Closed => Err(WsError::ConnectionClosed),
            from => Err(WsError::InvalidTransition {
                from,
                to: ConnectionState::Open,
            }),
        }
    }

    fn ensure_can_send(&self) -> Result<(), WsError> {
        if self.state.is_closed() {
            return Err(WsError::ConnectionClosed);
        }
        if !self.state.can_send() || self.close_sent {
            return Err(WsError::NotOpen(self.state));
        }
        Ok(())
    }
}

/// Splits a handshake head from the frame bytes that follow it.
fn split_head(bytes: &[u8]) -> Result<(&str, &[u8]), WsError> {
    let len = handshake_head_len(bytes).ok_or(WsError::IncompleteHandshake)?;
    let (head, rest) = bytes.split_at(len);
    let head = std::str::from_utf8(head)
        .map_err(|_| WsError::InvalidHandshake("head is not UTF-8".into()))?;
    Ok((head, rest))
}

/// Cuts `reason` so that code plus reason fit a control frame.
fn truncate_reason(reason: &str) -> String {
    let max = MAX_CONTROL_PAYLOAD - 2;
    if reason.len() <= max {
        return reason.to_owned();
    }
    let mut end = max;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    reason[..end].to_owned()
}

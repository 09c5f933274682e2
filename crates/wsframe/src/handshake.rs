//! Opening handshake (RFC 6455 §4).
//!
//! Only the lines that matter to the upgrade are modeled:
//!
//! ```http
//! GET /chat HTTP/1.1
//! Host: server.example.com
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==
//! Sec-WebSocket-Version: 13
//! ```
//!
//! ```http
//! HTTP/1.1 101 Switching Protocols
//! Upgrade: websocket
//! Connection: Upgrade
//! Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! ```

use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::error::{HandshakeRejection, WsError};

/// GUID appended to the client key before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this crate speaks.
pub const WS_VERSION: &str = "13";

const SWITCHING_PROTOCOLS: u16 = 101;

/// `base64(SHA-1(client_key + GUID))`.
///
/// ```
/// use wsframe::compute_accept_key;
///
/// assert_eq!(
///     compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
///     "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
/// );
/// ```
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// A fresh `Sec-WebSocket-Key`: 16 random bytes, base64 encoded.
pub fn generate_client_key() -> String {
    let nonce: [u8; 16] = rand::random();
    STANDARD.encode(nonce)
}

/// Length of the handshake head at the start of `buf`, blank line included,
/// or `None` while the blank line has not arrived.
///
/// Anything after the head is frame data the peer sent right behind it.
pub fn handshake_head_len(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|at| at + HEAD_TERMINATOR.len())
}

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

fn invalid(msg: impl Into<String>) -> WsError {
    WsError::InvalidHandshake(msg.into())
}

/// Refuses values that would end the header line early.
fn check_field(name: &'static str, value: &str) -> Result<(), WsError> {
    if value.contains(|c: char| c == '\r' || c == '\n') {
        return Err(invalid(format!("{name} must not contain CR or LF")));
    }
    Ok(())
}

/// Start line and headers of an HTTP head, up to the blank line.
struct Head<'a> {
    start: &'a str,
    headers: Vec<(&'a str, &'a str)>,
}

impl<'a> Head<'a> {
    fn parse(text: &'a str) -> Result<Self, WsError> {
        let (head, _) = text
            .split_once("\r\n\r\n")
            .ok_or_else(|| invalid("missing blank line terminator"))?;
        let mut lines = head.split("\r\n");
        let start = lines.next().unwrap_or_default();
        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| invalid(format!("malformed header line: {line:?}")))?;
            headers.push((name.trim(), value.trim()));
        }
        Ok(Self { start, headers })
    }

    fn get(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| *v)
    }

    fn require(&self, name: &'static str) -> Result<&'a str, WsError> {
        self.get(name)
            .ok_or_else(|| invalid(format!("missing {name} header")))
    }

    /// True if the comma separated header value contains `token`.
    fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name).is_some_and(|v| {
            v.split(',')
                .any(|t| t.trim().eq_ignore_ascii_case(token))
        })
    }
}

/// Client side of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    pub host: String,
    pub path: String,
    /// Base64 of 16 random bytes.
    pub key: String,
    /// `Sec-WebSocket-Protocol` value: one or more comma separated names in
    /// preference order.
    pub protocol: Option<String>,
}

impl HandshakeRequest {
    /// A request with a freshly generated key.
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            key: generate_client_key(),
            protocol: None,
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Replaces the generated key, e.g. to replay a known exchange.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The accept key a conforming server answers with.
    pub fn expected_accept(&self) -> String {
        compute_accept_key(&self.key)
    }

    /// Offered subprotocols, trimmed, in preference order.
    pub fn offered_protocols(&self) -> impl Iterator<Item = &str> {
        self.protocol
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Renders the request head, terminated by an empty line.
    ///
    /// Fails if a field contains CR or LF, or the path contains a space.
    pub fn build(&self) -> Result<String, WsError> {
        check_field("host", &self.host)?;
        check_field("path", &self.path)?;
        check_field("key", &self.key)?;
        if let Some(protocol) = &self.protocol {
            check_field("protocol", protocol)?;
        }
        if self.path.contains(' ') {
            return Err(invalid("path must not contain spaces"));
        }

        let mut out = String::with_capacity(192);
        let _ = write!(out, "GET {} HTTP/1.1\r\n", self.path);
        let _ = write!(out, "Host: {}\r\n", self.host);
        out.push_str("Upgrade: websocket\r\n");
        out.push_str("Connection: Upgrade\r\n");
        let _ = write!(out, "Sec-WebSocket-Key: {}\r\n", self.key);
        let _ = write!(out, "Sec-WebSocket-Version: {WS_VERSION}\r\n");
        if let Some(protocol) = &self.protocol {
            let _ = write!(out, "Sec-WebSocket-Protocol: {protocol}\r\n");
        }
        out.push_str("\r\n");
        Ok(out)
    }

    /// Server side: reads and checks a client's request head.
    pub fn parse(text: &str) -> Result<Self, WsError> {
        let head = Head::parse(text)?;
        let mut parts = head.start.split(' ');
        let (method, path, version) = match (parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(p), Some(v)) if parts.next().is_none() => (m, p, v),
            _ => return Err(invalid(format!("malformed request line: {:?}", head.start))),
        };
        if method != "GET" {
            return Err(invalid(format!("method must be GET, got {method}")));
        }
        if version != "HTTP/1.1" {
            return Err(invalid(format!("unsupported HTTP version {version}")));
        }

        let host = head.require("Host")?;
        if !head.has_token("Upgrade", "websocket") {
            return Err(invalid("Upgrade header must be websocket"));
        }
        if !head.has_token("Connection", "upgrade") {
            return Err(invalid("Connection header must include Upgrade"));
        }
        let ws_version = head.require("Sec-WebSocket-Version")?;
        if ws_version != WS_VERSION {
            return Err(invalid(format!("unsupported WebSocket version {ws_version}")));
        }
        let key = head.require("Sec-WebSocket-Key")?;
        match STANDARD.decode(key) {
            Ok(nonce) if nonce.len() == 16 => {}
            _ => return Err(invalid("Sec-WebSocket-Key must be base64 of 16 bytes")),
        }

        Ok(Self {
            host: host.to_owned(),
            path: path.to_owned(),
            key: key.to_owned(),
            protocol: head.get("Sec-WebSocket-Protocol").map(str::to_owned),
        })
    }
}

/// Server side of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub status: u16,
    pub accept: Option<String>,
    pub protocol: Option<String>,
}

impl HandshakeResponse {
    /// The 101 reply to `request`, selecting its first offered subprotocol.
    pub fn accept(request: &HandshakeRequest) -> Self {
        Self {
            status: SWITCHING_PROTOCOLS,
            accept: Some(request.expected_accept()),
            protocol: request.offered_protocols().next().map(str::to_owned),
        }
    }

    /// A refusal with the given HTTP status.
    pub fn reject(status: u16) -> Self {
        Self {
            status,
            accept: None,
            protocol: None,
        }
    }

    /// Status is 101 and an accept key is present. Does not check the key;
    /// use [`HandshakeResponse::verify`] before trusting the connection.
    pub fn is_valid(&self) -> bool {
        self.status == SWITCHING_PROTOCOLS && self.accept.is_some()
    }

    /// Checks the response against the request that produced it.
    pub fn verify(&self, request: &HandshakeRequest) -> Result<(), WsError> {
        let result = self.check(request);
        match &result {
            Ok(()) => debug!(path = %request.path, "handshake accepted"),
            Err(err) => warn!(path = %request.path, %err, "handshake rejected"),
        }
        result
    }

    fn check(&self, request: &HandshakeRequest) -> Result<(), WsError> {
        if self.status != SWITCHING_PROTOCOLS {
            return Err(HandshakeRejection::NotSwitchingProtocols(self.status).into());
        }
        let actual = self
            .accept
            .as_deref()
            .ok_or(HandshakeRejection::MissingAcceptKey)?;
        let expected = request.expected_accept();
        if actual != expected {
            return Err(HandshakeRejection::AcceptKeyMismatch {
                expected,
                actual: actual.to_owned(),
            }
            .into());
        }
        if let Some(selected) = &self.protocol {
            if !request.offered_protocols().any(|name| name == selected) {
                return Err(HandshakeRejection::UnexpectedSubprotocol(selected.clone()).into());
            }
        }
        Ok(())
    }

    /// Renders the response head, terminated by an empty line.
    ///
    /// Fails if the accept key or subprotocol contains CR or LF.
    pub fn build(&self) -> Result<String, WsError> {
        if let Some(accept) = &self.accept {
            check_field("accept", accept)?;
        }
        if let Some(protocol) = &self.protocol {
            check_field("protocol", protocol)?;
        }

        let mut out = String::with_capacity(160);
        let _ = write!(
            out,
            "HTTP/1.1 {} {}\r\n",
            self.status,
            reason_phrase(self.status)
        );
        if self.status == SWITCHING_PROTOCOLS {
            out.push_str("Upgrade: websocket\r\n");
            out.push_str("Connection: Upgrade\r\n");
        } else {
            let _ = write!(out, "Sec-WebSocket-Version: {WS_VERSION}\r\n");
        }
        if let Some(accept) = &self.accept {
            let _ = write!(out, "Sec-WebSocket-Accept: {accept}\r\n");
        }
        if let Some(protocol) = &self.protocol {
            let _ = write!(out, "Sec-WebSocket-Protocol: {protocol}\r\n");
        }
        out.push_str("\r\n");
        Ok(out)
    }

    /// Client side: reads a server's response head.
    ///
    /// Only the status line and the accept/protocol headers are extracted;
    /// judging them is left to [`HandshakeResponse::verify`].
    pub fn parse(text: &str) -> Result<Self, WsError> {
        let head = Head::parse(text)?;
        let mut parts = head.start.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(invalid(format!("malformed status line: {:?}", head.start)));
        }
        let status = parts
            .next()
            .and_then(|s| s.parse::<u16>().ok())
            .ok_or_else(|| invalid(format!("malformed status line: {:?}", head.start)))?;
        Ok(Self {
            status,
            accept: head.get("Sec-WebSocket-Accept").map(str::to_owned),
            protocol: head.get("Sec-WebSocket-Protocol").map(str::to_owned),
        })
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        101 => "Switching Protocols",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        426 => "Upgrade Required",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

//! Close status codes and the close frame payload (RFC 6455 §5.5.1, §7.4).
//!
//! A close payload is either empty or a 2-byte big-endian status code
//! followed by a UTF-8 reason. The frame length bounds the reason, so there is
//! no length prefix.

use crate::error::WsError;
use crate::MAX_CONTROL_PAYLOAD;

/// Close status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// 1000: purpose fulfilled.
    Normal,
    /// 1001: endpoint going away (server shutdown, page navigation).
    GoingAway,
    /// 1002: protocol error.
    ProtocolError,
    /// 1003: data type the endpoint cannot accept.
    UnsupportedData,
    /// 1005: no status code was present. Never sent.
    NoStatus,
    /// 1006: closed without a close frame. Never sent.
    Abnormal,
    /// 1007: payload inconsistent with the message type (e.g. bad UTF-8).
    InvalidFrame,
    /// 1008: policy violation.
    PolicyViolation,
    /// 1009: message too big to process.
    MessageTooBig,
    /// 1010: client expected an extension the server did not negotiate.
    MandatoryExtension,
    /// 1011: unexpected server condition.
    InternalError,
    /// 1012: service restart.
    ServiceRestart,
    /// 1013: try again later.
    TryAgainLater,
    /// 1014: bad gateway.
    BadGateway,
    /// 1015: TLS handshake failure. Never sent.
    TlsHandshake,
    /// Any other value, kept verbatim.
    Other(u16),
}

impl CloseCode {
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1002 => Self::ProtocolError,
            1003 => Self::UnsupportedData,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::InvalidFrame,
            1008 => Self::PolicyViolation,
            1009 => Self::MessageTooBig,
            1010 => Self::MandatoryExtension,
            1011 => Self::InternalError,
            1012 => Self::ServiceRestart,
            1013 => Self::TryAgainLater,
            1014 => Self::BadGateway,
            1015 => Self::TlsHandshake,
            other => Self::Other(other),
        }
    }

    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::GoingAway => 1001,
            Self::ProtocolError => 1002,
            Self::UnsupportedData => 1003,
            Self::NoStatus => 1005,
            Self::Abnormal => 1006,
            Self::InvalidFrame => 1007,
            Self::PolicyViolation => 1008,
            Self::MessageTooBig => 1009,
            Self::MandatoryExtension => 1010,
            Self::InternalError => 1011,
            Self::ServiceRestart => 1012,
            Self::TryAgainLater => 1013,
            Self::BadGateway => 1014,
            Self::TlsHandshake => 1015,
            Self::Other(code) => code,
        }
    }

    /// Whether the code may appear in a close frame on the wire.
    ///
    /// 1005, 1006 and 1015 are reserved for local reporting. Values below
    /// 1000, 1004 and 1016-2999 are unassigned; 3000-4999 belong to libraries
    /// and applications.
    pub const fn is_sendable(self) -> bool {
        match self {
            Self::NoStatus | Self::Abnormal | Self::TlsHandshake => false,
            Self::Other(code) => matches!(code, 3000..=4999),
            _ => true,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// Decoded close frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// `None` when the payload was empty (reported locally as 1005).
    pub code: Option<CloseCode>,
    pub reason: String,
}

impl CloseFrame {
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
        }
    }

    /// A close frame with an empty payload.
    pub fn empty() -> Self {
        Self {
            code: None,
            reason: String::new(),
        }
    }

    /// Parses an (already unmasked) close payload.
    pub fn parse(payload: &[u8]) -> Result<Self, WsError> {
        match payload.len() {
            0 => return Ok(Self::empty()),
            1 => return Err(WsError::InvalidClosePayload),
            len if len > MAX_CONTROL_PAYLOAD => {
                return Err(WsError::ControlFramePayloadTooLarge(len))
            }
            _ => {}
        }
        let raw = u16::from_be_bytes([payload[0], payload[1]]);
        let code = CloseCode::from_u16(raw);
        if !code.is_sendable() {
            return Err(WsError::InvalidCloseCode(raw));
        }
        let reason = std::str::from_utf8(&payload[2..]).map_err(|_| WsError::InvalidUtf8)?;
        Ok(Self {
            code: Some(code),
            reason: reason.to_owned(),
        })
    }

    /// Encodes the payload: status code then reason, or nothing when there is
    /// no code.
    pub fn encode(&self) -> Vec<u8> {
        match self.code {
            None => Vec::new(),
            Some(code) => close_payload(code.as_u16(), &self.reason),
        }
    }

    /// The code to report locally; an empty payload reads as 1005.
    pub fn reported_code(&self) -> CloseCode {
        self.code.unwrap_or(CloseCode::NoStatus)
    }
}

pub(crate) fn close_payload(code: u16, reason: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + reason.len());
    payload.extend_from_slice(&code.to_be_bytes());
    payload.extend_from_slice(reason.as_bytes());
    payload
}

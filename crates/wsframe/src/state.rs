//! Connection lifecycle.

use crate::error::WsError;

/// Lifecycle of one connection.
///
/// Moves strictly forward one step at a time:
/// `Connecting -> Open -> Closing -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Handshake not completed yet.
    #[default]
    Connecting,
    /// Handshake accepted; data flows both ways.
    Open,
    /// A close frame was sent or received.
    Closing,
    /// Close handshake finished or the transport went away.
    Closed,
}

impl ConnectionState {
    /// True in `Open` and `Closing`: a closing endpoint still sends its own
    /// close frame.
    pub const fn can_send(self) -> bool {
        matches!(self, Self::Open | Self::Closing)
    }

    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// The state after this one, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Connecting => Some(Self::Open),
            Self::Open => Some(Self::Closing),
            Self::Closing => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Moves to `to`, which must be the immediate successor.
    pub fn transition(&mut self, to: Self) -> Result<(), WsError> {
        if self.next() != Some(to) {
            return Err(WsError::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

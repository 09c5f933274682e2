//! WebSocket frame opcodes (RFC 6455 §5.2).

/// Frame opcode.
///
/// The opcode field is 4 bits wide. Values without an assigned meaning decode
/// into [`Opcode::Unrecognized`] instead of failing, so a peer speaking an
/// extension does not break the parser; the consumer decides what to do with
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Continuation fragment of a data message.
    Continuation,
    /// UTF-8 text data frame.
    Text,
    /// Binary data frame.
    Binary,
    /// Close control frame.
    Close,
    /// Ping control frame.
    Ping,
    /// Pong control frame.
    Pong,
    /// Reserved value (3-7 or 11-15), kept as its raw 4-bit value.
    Unrecognized(u8),
}

impl Opcode {
    /// Lowest opcode value in the control range.
    pub const MIN_CONTROL_OPCODE: u8 = 8;

    /// Maps the low 4 bits of `bits` to an opcode. Never fails.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x0f {
            0x0 => Self::Continuation,
            0x1 => Self::Text,
            0x2 => Self::Binary,
            0x8 => Self::Close,
            0x9 => Self::Ping,
            0xa => Self::Pong,
            other => Self::Unrecognized(other),
        }
    }

    /// The 4-bit wire value.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Continuation => 0x0,
            Self::Text => 0x1,
            Self::Binary => 0x2,
            Self::Close => 0x8,
            Self::Ping => 0x9,
            Self::Pong => 0xa,
            Self::Unrecognized(v) => v & 0x0f,
        }
    }

    /// Close, ping and pong. Reserved values 11-15 also sit in the control
    /// range but are not reported here.
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }

    /// Continuation, text and binary.
    pub const fn is_data(self) -> bool {
        matches!(self, Self::Continuation | Self::Text | Self::Binary)
    }

    pub const fn is_recognized(self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<u8> for Opcode {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_nibble_decodes() {
        for bits in 0u8..16 {
            let opcode = Opcode::from_bits(bits);
            assert_eq!(opcode.bits(), bits);
            assert_eq!(u8::from(opcode), bits);
        }
    }

    #[test]
    fn reserved_values_are_unrecognized() {
        for bits in (3u8..=7).chain(11..=15) {
            let opcode = Opcode::from(bits);
            assert_eq!(opcode, Opcode::Unrecognized(bits));
            assert!(!opcode.is_recognized());
            assert!(!opcode.is_control());
            assert!(!opcode.is_data());
        }
    }

    #[test]
    fn control_and_data_partition() {
        assert!(Opcode::Close.is_control());
        assert!(Opcode::Ping.is_control());
        assert!(Opcode::Pong.is_control());
        assert!(Opcode::Continuation.is_data());
        assert!(Opcode::Text.is_data());
        assert!(Opcode::Binary.is_data());
        assert!(!Opcode::Text.is_control());
    }
}

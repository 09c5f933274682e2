//! Connection limits and behavior knobs.

use serde::Deserialize;

use crate::error::ConfigError;

/// Settings for a [`crate::Connection`].
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```
/// use wsframe::WsConfig;
///
/// let config = WsConfig::from_toml_str("fragment_size = 4096\nauto_pong = false").unwrap();
/// assert_eq!(config.fragment_size, Some(4096));
/// assert!(!config.auto_pong);
/// assert_eq!(config.ping_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WsConfig {
    /// Largest declared payload length accepted on a single inbound frame.
    pub max_frame_size: u64,
    /// Largest reassembled inbound message.
    pub max_message_size: usize,
    /// Outbound messages longer than this are split into fragments.
    pub fragment_size: Option<usize>,
    /// Window after a ping during which the peer counts as alive.
    pub ping_timeout_ms: u64,
    /// Answer inbound pings with a pong carrying the same payload.
    pub auto_pong: bool,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 16 << 20,
            max_message_size: 64 << 20,
            fragment_size: None,
            ping_timeout_ms: 30_000,
            auto_pong: true,
        }
    }
}

impl WsConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_size == 0 {
            return Err(ConfigError::Invalid("max_frame_size must be non-zero"));
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::Invalid("max_message_size must be non-zero"));
        }
        if self.fragment_size == Some(0) {
            return Err(ConfigError::Invalid("fragment_size must be non-zero"));
        }
        if self.ping_timeout_ms == 0 {
            return Err(ConfigError::Invalid("ping_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}

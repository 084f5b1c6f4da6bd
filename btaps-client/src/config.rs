//! Session configuration and builder
//!
//! ```rust,no_run
//! use btaps_client::SessionBuilder;
//! use btaps_transport::SerialTransport;
//! use std::time::Duration;
//!
//! let address = "00:11:22:33:44:55".parse()?;
//! let transport = SerialTransport::new_simple(address, 1, "/dev/rfcomm0");
//! let session = SessionBuilder::new("00:11:22:33:44:55".parse()?)
//!     .response_timeout(Duration::from_millis(1500))
//!     .build(transport);
//! # Ok::<(), btaps_core::BtapsError>(())
//! ```

use crate::session::DeviceSession;
use btaps_core::DeviceAddress;
use btaps_transport::Transport;
use std::time::Duration;

/// Response window used when none is configured
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Device session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long an exchange waits for the device after the write completed
    pub response_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

/// Builder for device sessions
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    address: DeviceAddress,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a builder for the device at `address` with default settings
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            config: SessionConfig::default(),
        }
    }

    /// Set the response window for every exchange
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Build a disconnected session over `transport`
    pub fn build<T: Transport>(self, transport: T) -> DeviceSession<T> {
        DeviceSession::with_config(self.address, transport, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(SessionConfig::default().response_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn test_builder_overrides() {
        let builder = SessionBuilder::new(DeviceAddress::new("dev"))
            .response_timeout(Duration::from_millis(250));
        assert_eq!(builder.config.response_timeout, Duration::from_millis(250));

        let builder = builder.config(SessionConfig::default());
        assert_eq!(builder.config, SessionConfig::default());
    }
}

use crate::error::{BtapsError, BtapsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Address of a BTaps device
///
/// The address is only ever handed to the transport to locate a channel, so
/// no structure is assumed. For Bluetooth links it is usually the
/// `AA:BB:CC:DD:EE:FF` device address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Create a new device address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeviceAddress {
    type Err = BtapsError;

    fn from_str(s: &str) -> BtapsResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(BtapsError::InvalidData(
                "Device address must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        let addr: DeviceAddress = " 00:11:22:33:44:55 ".parse().unwrap();
        assert_eq!(addr.as_str(), "00:11:22:33:44:55");
        assert_eq!(addr.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn test_parse_empty_address() {
        assert!("  ".parse::<DeviceAddress>().is_err());
    }
}

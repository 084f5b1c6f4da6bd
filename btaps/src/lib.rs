//! btaps - Rust driver for the BTaps Bluetooth programmable power switch
//!
//! This library turns the raw byte stream of a BTaps switch into typed
//! operations (switch on/off, clock sync, timer create/modify/delete, state
//! fetch) and keeps a local cache of the switch flag and timer table.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `btaps-core`: Core types and error handling
//! - `btaps-protocol`: Frame codec, bad-hex numerals, state response reassembly
//! - `btaps-transport`: Transport contract and RFCOMM serial adapter
//! - `btaps-client`: Device session
//!
//! # Usage
//!
//! ```no_run
//! use btaps::client::SessionBuilder;
//! use btaps::transport::SerialTransport;
//!
//! # async fn run() -> btaps::BtapsResult<()> {
//! let address: btaps::DeviceAddress = "00:11:22:33:44:55".parse()?;
//! let session = SessionBuilder::new(address.clone())
//!     .build(SerialTransport::new_simple(address, 1, "/dev/rfcomm0"));
//! session.connect().await?;
//! println!("switch on: {}", session.is_enabled());
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use btaps_core::*;

// Re-export client API
pub mod client {
    pub use btaps_client::*;
}

// Re-export protocol codec
pub mod protocol {
    pub use btaps_protocol::*;
}

// Re-export transport layer
pub mod transport {
    pub use btaps_transport::*;
}

//! Transport layer for the BTaps power switch
//!
//! This crate defines what the driver needs from the underlying radio link
//! and provides an adapter for Bluetooth RFCOMM ports exposed as serial TTYs.

pub mod serial;
pub mod stream;

pub use serial::{RfcommBinding, SerialSettings, SerialTransport};
pub use stream::{ChannelId, Transport, TransportEvent};

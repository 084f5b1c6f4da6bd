//! Transport trait and inbound event stream

use async_trait::async_trait;
use btaps_core::{BtapsResult, DeviceAddress};
use bytes::Bytes;
use std::fmt;
use tokio::sync::mpsc;

/// Channel on the remote device that carries the serial protocol
///
/// For Bluetooth links this is the RFCOMM channel number found by service
/// discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u8);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {}", self.0)
    }
}

/// Notification delivered by an open transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A chunk of bytes arrived from the device
    Data(Bytes),
    /// The channel was closed by the remote side or failed
    Closed,
}

/// Link to a BTaps device
///
/// The driver only needs channel discovery, open/close, completion-notified
/// writes and the inbound event stream. The physical link technology is up
/// to the implementation.
///
/// # Event stream
/// `open()` returns the receiving end of the event stream. Dropping the
/// sending end is treated the same as `TransportEvent::Closed`.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Look up the serial channel for a device
    ///
    /// # Returns
    /// `None` if the device exposes no usable channel
    async fn discover_channel(&mut self, address: &DeviceAddress) -> BtapsResult<Option<ChannelId>>;

    /// Open the channel and start delivering inbound events
    async fn open(
        &mut self,
        address: &DeviceAddress,
        channel: ChannelId,
    ) -> BtapsResult<mpsc::Receiver<TransportEvent>>;

    /// Write a frame, returning once the write has completed
    async fn write(&mut self, frame: &[u8]) -> BtapsResult<()>;

    /// Close the channel
    async fn close(&mut self) -> BtapsResult<()>;
}

//! RFCOMM serial port transport implementation
//!
//! On Linux a Bluetooth serial link is usually bound to a TTY with
//! `rfcomm bind /dev/rfcomm0 <address> <channel>`. This transport maps
//! device addresses to such bound ports, opens them with `tokio-serial`
//! and forwards every chunk read from the port as one inbound event.

use crate::stream::{ChannelId, Transport, TransportEvent};
use async_trait::async_trait;
use btaps_core::{BtapsError, BtapsResult, DeviceAddress};
use bytes::Bytes;
use std::fmt;
use std::ops::{Deref, DerefMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;

/// Wrapper for the write half of a SerialStream that implements Debug
struct DebugSerialWriter(WriteHalf<SerialStream>);

impl fmt::Debug for DebugSerialWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialWriter").finish()
    }
}

impl Deref for DebugSerialWriter {
    type Target = WriteHalf<SerialStream>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DebugSerialWriter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// A device address bound to a local RFCOMM TTY
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfcommBinding {
    pub address: DeviceAddress,
    pub channel: ChannelId,
    pub port_name: String,
}

impl RfcommBinding {
    pub fn new(address: DeviceAddress, channel: u8, port_name: impl Into<String>) -> Self {
        Self {
            address,
            channel: ChannelId(channel),
            port_name: port_name.into(),
        }
    }
}

/// Serial port transport settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub bindings: Vec<RfcommBinding>,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    /// Size of the buffer each read is made into
    pub read_buffer_size: usize,
    /// Capacity of the inbound event channel
    pub event_capacity: usize,
}

impl SerialSettings {
    /// Create new serial settings with default parameters
    pub fn new(bindings: Vec<RfcommBinding>) -> Self {
        Self {
            bindings,
            baud_rate: 9600,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
            read_buffer_size: 256,
            event_capacity: 32,
        }
    }

    /// Add a bound port
    pub fn with_binding(mut self, binding: RfcommBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    fn binding_for(&self, address: &DeviceAddress) -> Option<&RfcommBinding> {
        self.bindings.iter().find(|b| &b.address == address)
    }
}

/// Serial port transport implementation
///
/// Every read from the TTY becomes one `TransportEvent::Data`. The TTY does
/// not preserve the device's write boundaries, so two device frames that
/// land in the same read arrive as a single event. In particular a state
/// response terminator read together with the last timer frame is not seen
/// as a terminator, and the state fetch times out.
#[derive(Debug)]
pub struct SerialTransport {
    writer: Option<DebugSerialWriter>,
    reader_task: Option<JoinHandle<()>>,
    settings: SerialSettings,
}

impl SerialTransport {
    /// Create a new serial transport
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            writer: None,
            reader_task: None,
            settings,
        }
    }

    /// Create a serial transport for a single device bound to `port_name`
    pub fn new_simple(address: DeviceAddress, channel: u8, port_name: &str) -> Self {
        Self::new(SerialSettings::new(vec![RfcommBinding::new(address, channel, port_name)]))
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    async fn read_loop(
        mut reader: ReadHalf<SerialStream>,
        events: mpsc::Sender<TransportEvent>,
        buffer_size: usize,
    ) {
        let mut buf = vec![0u8; buffer_size.max(1)];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    log::debug!("Serial port reached EOF");
                    break;
                }
                Ok(n) => {
                    let chunk = Bytes::copy_from_slice(&buf[..n]);
                    if events.send(TransportEvent::Data(chunk)).await.is_err() {
                        // receiver dropped, nobody is listening any more
                        return;
                    }
                }
                Err(e) => {
                    log::error!("Error reading serial port: {}", e);
                    break;
                }
            }
        }
        let _ = events.send(TransportEvent::Closed).await;
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn discover_channel(&mut self, address: &DeviceAddress) -> BtapsResult<Option<ChannelId>> {
        let Some(binding) = self.settings.binding_for(address) else {
            return Ok(None);
        };

        // an unbound rfcomm device node means the channel is not available
        match tokio::fs::metadata(&binding.port_name).await {
            Ok(_) => Ok(Some(binding.channel)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Port {} for {} not present", binding.port_name, address);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open(
        &mut self,
        address: &DeviceAddress,
        channel: ChannelId,
    ) -> BtapsResult<mpsc::Receiver<TransportEvent>> {
        if self.is_open() {
            return Err(BtapsError::Connect(
                "Connection has already been opened".to_string(),
            ));
        }

        let binding = self
            .settings
            .binding_for(address)
            .filter(|b| b.channel == channel)
            .ok_or_else(|| {
                BtapsError::Connect(format!("No port bound to {} on {}", address, channel))
            })?;

        let builder = tokio_serial::new(&binding.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            BtapsError::Connect(format!("Failed to open serial port {}: {}", binding.port_name, e))
        })?;

        let (reader, writer) = tokio::io::split(stream);
        let (tx, rx) = mpsc::channel(self.settings.event_capacity.max(1));
        self.reader_task = Some(tokio::spawn(Self::read_loop(
            reader,
            tx,
            self.settings.read_buffer_size,
        )));
        self.writer = Some(DebugSerialWriter(writer));
        log::info!("Opened {} for {}", binding.port_name, address);
        Ok(rx)
    }

    async fn write(&mut self, frame: &[u8]) -> BtapsResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BtapsError::Write("Serial stream not connected".to_string()))?;

        writer
            .write_all(frame)
            .await
            .map_err(|e| BtapsError::Write(e.to_string()))?;
        writer.flush().await.map_err(|e| BtapsError::Write(e.to_string()))
    }

    async fn close(&mut self) -> BtapsResult<()> {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> DeviceAddress {
        DeviceAddress::new("00:11:22:33:44:55")
    }

    #[test]
    fn test_serial_settings() {
        let settings = SerialSettings::new(Vec::new())
            .with_binding(RfcommBinding::new(address(), 1, "/dev/rfcomm0"));
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.binding_for(&address()).unwrap().port_name, "/dev/rfcomm0");
        assert!(settings.binding_for(&DeviceAddress::new("66:77:88:99:AA:BB")).is_none());
    }

    #[tokio::test]
    async fn test_discover_unknown_address() {
        let mut transport = SerialTransport::new_simple(address(), 1, "/dev/rfcomm0");
        let found = transport
            .discover_channel(&DeviceAddress::new("66:77:88:99:AA:BB"))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_discover_missing_port() {
        let mut transport =
            SerialTransport::new_simple(address(), 1, "/nonexistent/btaps-rfcomm-test");
        assert!(transport.discover_channel(&address()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_discover_unreadable_port_path() {
        // a path below a regular file is a configuration error, not an absent port
        let mut transport = SerialTransport::new_simple(address(), 1, "Cargo.toml/rfcomm0");
        let result = transport.discover_channel(&address()).await;
        assert!(matches!(result, Err(BtapsError::Io(_))));
    }

    #[tokio::test]
    async fn test_write_before_open() {
        let mut transport = SerialTransport::new_simple(address(), 1, "/dev/rfcomm0");
        assert!(!transport.is_open());
        assert!(matches!(transport.write(&[0x00]).await, Err(BtapsError::Write(_))));
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_wrong_channel() {
        let mut transport = SerialTransport::new_simple(address(), 1, "/dev/rfcomm0");
        let result = transport.open(&address(), ChannelId(2)).await;
        assert!(matches!(result, Err(BtapsError::Connect(_))));
    }
}

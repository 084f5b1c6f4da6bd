//! Device session for a BTaps power switch
//!
//! # Connection Flow
//!
//! 1. **Discover**: ask the transport for the device's serial channel
//! 2. **Open**: open the channel and start routing inbound events
//! 3. **Sync**: fetch the switch flag and timer table into the cache
//! 4. **Ready**: commands are accepted
//!
//! # Exchanges
//!
//! Every command is one exchange: encode, register a listener, write, then
//! wait for the response or the response timeout, whichever comes first.
//! A failed write resolves the exchange immediately. Exchanges run one at a
//! time in call order; concurrent callers queue.
//!
//! # Cache
//!
//! The switch flag and timer table are authoritative right after connect or
//! a state fetch. Timer commands update the cache once the device answered.
//! `set_switch` does not touch the cached flag; call `refresh_state` to
//! re-read it. The cache is cleared whenever the session disconnects,
//! including when the device drops the link.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use btaps_client::DeviceSession;
//! use btaps_core::{TimeOfDay, TimerDescriptor};
//! use btaps_transport::SerialTransport;
//!
//! # async fn run() -> btaps_core::BtapsResult<()> {
//! let address: btaps_core::DeviceAddress = "00:11:22:33:44:55".parse()?;
//! let transport = SerialTransport::new_simple(address.clone(), 1, "/dev/rfcomm0");
//! let session = DeviceSession::new(address, transport);
//!
//! session.connect().await?;
//! session.set_switch(true).await?;
//! let timer = TimerDescriptor::new(1, "evening", TimeOfDay::new(18, 0)?, TimeOfDay::new(23, 30)?, true);
//! session.create_timer(&timer).await?;
//! session.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::SessionConfig;
use crate::dispatcher::{Collector, Dispatcher, ExchangeOutput};
use crate::state::SessionState;
use btaps_core::{
    BtapsError, BtapsResult, DeviceAddress, DeviceDateTime, StateSnapshot, TimerDescriptor,
    TimerId, TimerRegistry,
};
use btaps_protocol::{Command, StateAccumulator};
use btaps_transport::{Transport, TransportEvent};
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Timer to delete, by id or by descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    ById(TimerId),
    ByDescriptor(TimerDescriptor),
}

impl DeleteTarget {
    pub fn id(&self) -> TimerId {
        match self {
            DeleteTarget::ById(id) => *id,
            DeleteTarget::ByDescriptor(timer) => timer.id,
        }
    }
}

impl From<TimerId> for DeleteTarget {
    fn from(id: TimerId) -> Self {
        DeleteTarget::ById(id)
    }
}

impl From<TimerDescriptor> for DeleteTarget {
    fn from(timer: TimerDescriptor) -> Self {
        DeleteTarget::ByDescriptor(timer)
    }
}

impl From<&TimerDescriptor> for DeleteTarget {
    fn from(timer: &TimerDescriptor) -> Self {
        DeleteTarget::ByDescriptor(timer.clone())
    }
}

/// State shared between the session and its inbound task
#[derive(Debug, Default)]
struct SessionInner {
    state: SessionState,
    enabled: bool,
    timers: TimerRegistry,
    dispatcher: Dispatcher,
    /// Bumped on every connect; lets a stale inbound task recognise itself
    generation: u64,
    /// The transport has been opened and not yet closed by us
    link_open: bool,
}

impl SessionInner {
    fn transition(&mut self, new_state: SessionState) -> BtapsResult<()> {
        self.state.validate_transition(new_state)?;
        if self.state != new_state {
            log::debug!("Session state {} -> {}", self.state.as_str(), new_state.as_str());
        }
        self.state = new_state;
        Ok(())
    }

    /// Drop to Disconnected and clear the cache
    fn reset(&mut self) {
        self.state = SessionState::Disconnected;
        self.enabled = false;
        self.timers.clear();
    }

    /// Whether a connect attempt of `generation` lost its link while in `expected`
    fn link_lost(&self, generation: u64, expected: SessionState) -> bool {
        self.generation != generation || self.state != expected
    }
}

fn lock(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Session with one BTaps device
///
/// All methods take `&self`; share the session behind an `Arc` to issue
/// commands from several tasks. Exchanges are queued in call order.
pub struct DeviceSession<T: Transport> {
    address: DeviceAddress,
    config: SessionConfig,
    transport: tokio::sync::Mutex<T>,
    /// Held for the whole of connect and of every exchange
    exchange_queue: tokio::sync::Mutex<()>,
    inner: Arc<Mutex<SessionInner>>,
    inbound_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport> DeviceSession<T> {
    /// Create a disconnected session with the default configuration
    pub fn new(address: DeviceAddress, transport: T) -> Self {
        Self::with_config(address, transport, SessionConfig::default())
    }

    /// Create a disconnected session
    pub fn with_config(address: DeviceAddress, transport: T, config: SessionConfig) -> Self {
        Self {
            address,
            config,
            transport: tokio::sync::Mutex::new(transport),
            exchange_queue: tokio::sync::Mutex::new(()),
            inner: Arc::new(Mutex::new(SessionInner::default())),
            inbound_task: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Cached switch flag; always `false` while disconnected
    pub fn is_enabled(&self) -> bool {
        lock(&self.inner).enabled
    }

    /// Cached timer table; empty while disconnected
    pub fn timers(&self) -> TimerRegistry {
        lock(&self.inner).timers.clone()
    }

    /// Cached timer with the given id
    pub fn timer(&self, id: TimerId) -> Option<TimerDescriptor> {
        lock(&self.inner).timers.get(&id).cloned()
    }

    /// Connect to the device and load its state
    ///
    /// # Errors
    /// - `BtapsError::Discovery` if no channel is found for the address
    /// - `BtapsError::Connect` if the transport rejects the open
    /// - any error of the initial state fetch
    /// - `BtapsError::ConnectionLost` if the device closes the link before the
    ///   state fetch is under way
    /// - `BtapsError::InvalidState` if the session is not disconnected
    ///
    /// On failure the session is left Disconnected with an empty cache.
    pub async fn connect(&self) -> BtapsResult<()> {
        let _queue = self.exchange_queue.lock().await;

        let (generation, stale_link) = {
            let mut inner = lock(&self.inner);
            if inner.state != SessionState::Disconnected {
                return Err(BtapsError::InvalidState(format!(
                    "Cannot connect while {}",
                    inner.state.as_str()
                )));
            }
            inner.transition(SessionState::Connecting)?;
            inner.generation = inner.generation.wrapping_add(1);
            (inner.generation, std::mem::replace(&mut inner.link_open, false))
        };

        log::info!("Connecting to {}", self.address);
        match self.open_and_sync(generation, stale_link).await {
            Ok(()) => {
                log::info!("Connected to {}", self.address);
                Ok(())
            }
            Err(e) => {
                log::warn!("Connect to {} failed: {}", self.address, e);
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn open_and_sync(&self, generation: u64, stale_link: bool) -> BtapsResult<()> {
        let events = {
            let mut transport = self.transport.lock().await;

            // the device dropped the previous link; release it before reopening
            if stale_link {
                let _ = transport.close().await;
            }

            let channel = match transport.discover_channel(&self.address).await {
                Ok(Some(channel)) => channel,
                Ok(None) => return Err(BtapsError::Discovery(self.address.to_string())),
                Err(BtapsError::Discovery(msg)) => return Err(BtapsError::Discovery(msg)),
                Err(e) => return Err(BtapsError::Discovery(format!("{}: {}", self.address, e))),
            };
            log::debug!("Found {} on {}", channel, self.address);

            let events = transport
                .open(&self.address, channel)
                .await
                .map_err(|e| match e {
                    BtapsError::Connect(msg) => BtapsError::Connect(msg),
                    other => BtapsError::Connect(other.to_string()),
                })?;
            lock(&self.inner).link_open = true;
            events
        };

        let task = tokio::spawn(run_inbound(Arc::clone(&self.inner), events, generation));
        if let Some(old) = self.inbound_slot().replace(task) {
            old.abort();
        }

        {
            let mut inner = lock(&self.inner);
            if inner.link_lost(generation, SessionState::Connecting) {
                return Err(BtapsError::ConnectionLost);
            }
            inner.transition(SessionState::Syncing)?;
        }

        let snapshot = match self.exchange(Command::GetState).await {
            Ok(ExchangeOutput::State(snapshot)) => snapshot,
            Ok(ExchangeOutput::Frame(_)) => {
                return Err(BtapsError::Decoding("Expected a state response".to_string()));
            }
            // the device closed the link before the fetch was registered
            Err(BtapsError::InvalidState(_))
                if lock(&self.inner).link_lost(generation, SessionState::Syncing) =>
            {
                return Err(BtapsError::ConnectionLost);
            }
            Err(e) => return Err(e),
        };

        let mut inner = lock(&self.inner);
        if inner.link_lost(generation, SessionState::Syncing) {
            return Err(BtapsError::ConnectionLost);
        }
        inner.enabled = snapshot.enabled;
        inner.timers = snapshot.timers;
        inner.transition(SessionState::Ready)
    }

    /// Close the channel and clear the cache
    ///
    /// An exchange still waiting for its response fails with
    /// `BtapsError::ConnectionLost`.
    pub async fn disconnect(&self) -> BtapsResult<()> {
        let was_open = {
            let mut inner = lock(&self.inner);
            if inner.dispatcher.has_pending() {
                log::debug!("Failing outstanding exchange on disconnect");
            }
            inner.dispatcher.fail_pending(BtapsError::ConnectionLost);
            inner.reset();
            std::mem::replace(&mut inner.link_open, false)
        };

        if let Some(task) = self.inbound_slot().take() {
            task.abort();
        }

        if was_open {
            log::info!("Disconnecting from {}", self.address);
            self.transport.lock().await.close().await?;
        }
        Ok(())
    }

    /// Turn the outlet on or off
    ///
    /// The cached switch flag is left unchanged.
    ///
    /// # Returns
    /// The device's response frame
    pub async fn set_switch(&self, enabled: bool) -> BtapsResult<Bytes> {
        self.queued_frame_exchange(Command::SetSwitch(enabled)).await
    }

    /// Set the device clock
    ///
    /// The year is sent as its last two digits.
    pub async fn set_date_time(&self, date_time: DeviceDateTime) -> BtapsResult<Bytes> {
        self.queued_frame_exchange(Command::SetDateTime(date_time)).await
    }

    /// Set the device clock to the local time
    pub async fn set_date_time_now(&self) -> BtapsResult<Bytes> {
        self.set_date_time(DeviceDateTime::now()).await
    }

    /// Create a timer on the device and add it to the cache
    pub async fn create_timer(&self, timer: &TimerDescriptor) -> BtapsResult<Bytes> {
        self.set_timer(timer, true).await
    }

    /// Overwrite a timer on the device and replace it in the cache
    pub async fn modify_timer(&self, timer: &TimerDescriptor) -> BtapsResult<Bytes> {
        self.set_timer(timer, false).await
    }

    async fn set_timer(&self, timer: &TimerDescriptor, create: bool) -> BtapsResult<Bytes> {
        let _queue = self.exchange_queue.lock().await;
        let generation = lock(&self.inner).generation;
        let command = Command::SetTimer {
            timer: timer.clone(),
            create,
        };
        let response = self.frame_exchange(command).await?;

        let mut inner = lock(&self.inner);
        if inner.generation == generation && inner.state.is_ready() {
            inner.timers.insert(timer.id, timer.clone());
        }
        Ok(response)
    }

    /// Delete a timer on the device and remove it from the cache
    ///
    /// The cache entry is only removed once the device answered; a failed
    /// write or a timeout leaves it in place.
    pub async fn delete_timer(&self, target: impl Into<DeleteTarget>) -> BtapsResult<Bytes> {
        let id = target.into().id();
        let _queue = self.exchange_queue.lock().await;
        let generation = lock(&self.inner).generation;
        let response = self.frame_exchange(Command::DeleteTimer(id)).await?;

        let mut inner = lock(&self.inner);
        if inner.generation == generation && inner.state.is_ready() {
            inner.timers.remove(&id);
        }
        Ok(response)
    }

    /// Fetch the switch flag and timer table and replace the cache
    pub async fn get_state(&self) -> BtapsResult<StateSnapshot> {
        let _queue = self.exchange_queue.lock().await;
        let generation = lock(&self.inner).generation;
        let snapshot = match self.exchange(Command::GetState).await? {
            ExchangeOutput::State(snapshot) => snapshot,
            ExchangeOutput::Frame(_) => {
                return Err(BtapsError::Decoding("Expected a state response".to_string()));
            }
        };

        let mut inner = lock(&self.inner);
        if inner.generation == generation && inner.state.is_ready() {
            inner.enabled = snapshot.enabled;
            inner.timers = snapshot.timers.clone();
        }
        Ok(snapshot)
    }

    /// Re-read the device state into the cache
    pub async fn refresh_state(&self) -> BtapsResult<()> {
        self.get_state().await.map(|_| ())
    }

    async fn queued_frame_exchange(&self, command: Command) -> BtapsResult<Bytes> {
        let _queue = self.exchange_queue.lock().await;
        self.frame_exchange(command).await
    }

    async fn frame_exchange(&self, command: Command) -> BtapsResult<Bytes> {
        match self.exchange(command).await? {
            ExchangeOutput::Frame(frame) => Ok(frame),
            ExchangeOutput::State(_) => {
                Err(BtapsError::Decoding("Unexpected state response".to_string()))
            }
        }
    }

    /// Run one request/response exchange
    ///
    /// The caller must hold `exchange_queue`.
    async fn exchange(&self, command: Command) -> BtapsResult<ExchangeOutput> {
        let name = command.name();
        let frame = command.encode()?;
        let collector = match command {
            Command::GetState => Collector::State(StateAccumulator::new()),
            _ => Collector::Single,
        };

        let (token, response) = {
            let mut inner = lock(&self.inner);
            let allowed = match inner.state {
                SessionState::Ready => true,
                SessionState::Syncing => matches!(collector, Collector::State(_)),
                _ => false,
            };
            if !allowed {
                return Err(BtapsError::InvalidState(format!(
                    "Cannot send {} while {}",
                    name,
                    inner.state.as_str()
                )));
            }
            inner.dispatcher.register(name, collector)
        };

        log::debug!("Writing {} {:02X?}", name, frame.as_ref());
        let written = self.transport.lock().await.write(&frame).await;
        if let Err(e) = written {
            lock(&self.inner).dispatcher.cancel(token);
            log::warn!("{} write failed: {}", name, e);
            return Err(match e {
                BtapsError::Write(msg) => BtapsError::Write(msg),
                other => BtapsError::Write(other.to_string()),
            });
        }

        match tokio::time::timeout(self.config.response_timeout, response).await {
            Ok(Ok(result)) => result,
            // registration dropped without an answer
            Ok(Err(_)) => Err(BtapsError::ConnectionLost),
            Err(_) => {
                lock(&self.inner).dispatcher.cancel(token);
                log::warn!("{} timed out", name);
                Err(BtapsError::Timeout(self.config.response_timeout.as_millis() as u64))
            }
        }
    }

    async fn teardown(&self) {
        let was_open = {
            let mut inner = lock(&self.inner);
            inner.dispatcher.fail_pending(BtapsError::ConnectionLost);
            inner.reset();
            std::mem::replace(&mut inner.link_open, false)
        };
        if let Some(task) = self.inbound_slot().take() {
            task.abort();
        }
        if was_open {
            if let Err(e) = self.transport.lock().await.close().await {
                log::warn!("Error closing transport for {}: {}", self.address, e);
            }
        }
    }

    fn inbound_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inbound_task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        if let Some(task) = self.inbound_slot().take() {
            task.abort();
        }
    }
}

/// Route transport events into the session until the link closes
async fn run_inbound(
    inner: Arc<Mutex<SessionInner>>,
    mut events: mpsc::Receiver<TransportEvent>,
    generation: u64,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Data(frame) => {
                let mut inner = lock(&inner);
                if inner.generation != generation {
                    return;
                }
                inner.dispatcher.on_frame(frame);
            }
            TransportEvent::Closed => break,
        }
    }

    let mut inner = lock(&inner);
    if inner.generation != generation || !inner.state.is_connected() {
        return;
    }
    log::info!("Link closed by device while {}", inner.state.as_str());
    inner.dispatcher.on_closed();
    inner.reset();
}

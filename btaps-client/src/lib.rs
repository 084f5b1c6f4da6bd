//! BTaps client implementation
//!
//! This crate provides the device session: it owns the transport channel,
//! sequences connect, state sync and command exchanges, and keeps a local
//! cache of the switch flag and the timer table.

pub mod config;
mod dispatcher;
pub mod session;
pub mod state;

pub use config::{SessionBuilder, SessionConfig, DEFAULT_RESPONSE_TIMEOUT};
pub use session::{DeleteTarget, DeviceSession};
pub use state::SessionState;

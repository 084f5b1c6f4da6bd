//! Core types and utilities for the BTaps power switch driver
//!
//! This crate provides the error taxonomy and the data model shared by
//! the protocol, transport and client crates.

pub mod address;
pub mod datetime;
pub mod error;
pub mod timer;

pub use address::DeviceAddress;
pub use datetime::DeviceDateTime;
pub use error::{BtapsError, BtapsResult};
pub use timer::{RepeatDays, StateSnapshot, TimeOfDay, TimerDescriptor, TimerId, TimerRegistry};

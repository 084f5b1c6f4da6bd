//! Wire protocol for the BTaps programmable power switch
//!
//! This crate is pure: it builds outbound command frames, decodes inbound
//! timer and state frames, and reassembles the multi-frame state response.
//! It performs no I/O.
//!
//! # Wire format
//!
//! - Every command frame starts with `0xCC 0xAA` and has a fixed length per command
//! - There is no checksum and no version field
//! - Numeric time fields use the "bad hex" encoding (see [`numeral`])
//! - A single `0x00` byte terminates a state response stream

pub mod accumulator;
pub mod command;
pub mod constants;
pub mod numeral;
pub mod response;

pub use accumulator::{AccumulatorPhase, StateAccumulator};
pub use command::Command;
pub use numeral::{bad_hex_decode, bad_hex_encode};
pub use response::{decode_timer_frame, is_terminator};

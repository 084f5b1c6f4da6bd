//! Outbound command frames
//!
//! Each command maps to one fixed-length frame:
//!
//! | Command       | Length | Layout |
//! |---------------|--------|--------|
//! | `SetSwitch`   | 6      | `CC AA 03 01 01 <on>` |
//! | `SetDateTime` | 12     | `CC AA 09 09 01 <yy> <mo> <dd> <hh> <mi> <ss> <wd>` |
//! | `SetTimer`    | 29     | `CC AA 1A <20 create / 03 modify> 01 <id> <days> <sh> <sm> <eh> <em> <on>`, name from offset 7, zero padded |
//! | `DeleteTimer` | 7      | `CC AA 04 19 01 01 <id>` |
//! | `GetState`    | 6      | `CC AA 03 12 01 13` |
//!
//! Time fields are bad-hex encoded.

use crate::constants::*;
use crate::numeral::bad_hex_encode;
use btaps_core::{BtapsError, BtapsResult, DeviceDateTime, RepeatDays, TimerDescriptor, TimerId};
use bytes::{BufMut, Bytes, BytesMut};

/// A command understood by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Turn the outlet on or off
    SetSwitch(bool),
    /// Set the device clock
    SetDateTime(DeviceDateTime),
    /// Create a new timer, or overwrite an existing one when `create` is false
    SetTimer { timer: TimerDescriptor, create: bool },
    /// Remove a timer
    DeleteTimer(TimerId),
    /// Request the switch flag and the timer table
    GetState,
}

impl Command {
    /// Encode the command to its wire frame
    ///
    /// # Errors
    /// Returns `BtapsError::Encoding` if a timer name exceeds
    /// [`MAX_TIMER_NAME_LEN`] bytes once UTF-8 encoded
    pub fn encode(&self) -> BtapsResult<Bytes> {
        let frame = match self {
            Command::SetSwitch(enabled) => {
                let mut buf = Self::header(6, SET_SWITCH_LENGTH, SET_SWITCH_OPCODE);
                buf.put_u8(*enabled as u8);
                buf
            }
            Command::SetDateTime(dt) => {
                let mut buf = Self::header(12, SET_DATE_TIME_LENGTH, SET_DATE_TIME_OPCODE);
                buf.put_u8(bad_hex_encode(dt.year as u32));
                buf.put_u8(bad_hex_encode(dt.month as u32));
                buf.put_u8(bad_hex_encode(dt.day as u32));
                buf.put_u8(bad_hex_encode(dt.hour as u32));
                buf.put_u8(bad_hex_encode(dt.minute as u32));
                buf.put_u8(bad_hex_encode(dt.second as u32));
                buf.put_u8(bad_hex_encode(dt.weekday as u32));
                buf
            }
            Command::SetTimer { timer, create } => Self::encode_set_timer(timer, *create)?,
            Command::DeleteTimer(id) => {
                let mut buf = Self::header(7, DELETE_TIMER_LENGTH, DELETE_TIMER_OPCODE);
                buf.put_u8(DELETE_TIMER_COUNT);
                buf.put_u8(*id);
                buf
            }
            Command::GetState => {
                let mut buf = Self::header(6, GET_STATE_LENGTH, GET_STATE_OPCODE);
                buf.put_u8(GET_STATE_TRAILER);
                buf
            }
        };
        Ok(frame.freeze())
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetSwitch(_) => "SetSwitch",
            Command::SetDateTime(_) => "SetDateTime",
            Command::SetTimer { create: true, .. } => "CreateTimer",
            Command::SetTimer { create: false, .. } => "ModifyTimer",
            Command::DeleteTimer(_) => "DeleteTimer",
            Command::GetState => "GetState",
        }
    }

    fn header(capacity: usize, length: u8, opcode: u8) -> BytesMut {
        let mut buf = BytesMut::with_capacity(capacity);
        buf.put_slice(&FRAME_HEADER);
        buf.put_u8(length);
        buf.put_u8(opcode);
        buf.put_u8(COMMAND_FLAG);
        buf
    }

    fn encode_set_timer(timer: &TimerDescriptor, create: bool) -> BtapsResult<BytesMut> {
        let name = timer.name.as_bytes();
        if name.len() > MAX_TIMER_NAME_LEN {
            return Err(BtapsError::Encoding(format!(
                "Timer name is {} bytes, at most {} allowed",
                name.len(),
                MAX_TIMER_NAME_LEN
            )));
        }

        let opcode = if create { CREATE_TIMER_OPCODE } else { MODIFY_TIMER_OPCODE };
        let mut buf = Self::header(SET_TIMER_FRAME_SIZE, SET_TIMER_LENGTH, opcode);
        buf.put_u8(timer.id);
        // reserved bit 0 is never sent, even for masks read back from the device
        buf.put_u8(RepeatDays::from_bits_truncate(timer.repeat_days.bits()).bits());
        buf.put_u8(bad_hex_encode(timer.start_time.hour() as u32));
        buf.put_u8(bad_hex_encode(timer.start_time.minute() as u32));
        buf.put_u8(bad_hex_encode(timer.end_time.hour() as u32));
        buf.put_u8(bad_hex_encode(timer.end_time.minute() as u32));
        buf.put_u8(timer.enabled as u8);
        buf.resize(SET_TIMER_FRAME_SIZE, 0);

        // The name is written from absolute offset 7, over the time fields,
        // exactly as the device has always been sent it.
        buf[SET_TIMER_NAME_OFFSET..SET_TIMER_NAME_OFFSET + name.len()].copy_from_slice(name);
        Ok(buf)
    }
}

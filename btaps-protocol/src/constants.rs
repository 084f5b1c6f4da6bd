//! Protocol constants

/// Header bytes of every device-bound frame
pub const FRAME_HEADER: [u8; 2] = [0xCC, 0xAA];

pub const SET_SWITCH_LENGTH: u8 = 0x03;
pub const SET_SWITCH_OPCODE: u8 = 0x01;

pub const SET_DATE_TIME_LENGTH: u8 = 0x09;
pub const SET_DATE_TIME_OPCODE: u8 = 0x09;

pub const SET_TIMER_LENGTH: u8 = 0x1A;
pub const CREATE_TIMER_OPCODE: u8 = 0x20;
pub const MODIFY_TIMER_OPCODE: u8 = 0x03;
/// Total size of a create/modify timer frame
pub const SET_TIMER_FRAME_SIZE: usize = 29;
/// Absolute frame offset the timer name is written from
pub const SET_TIMER_NAME_OFFSET: usize = 7;

pub const DELETE_TIMER_LENGTH: u8 = 0x04;
pub const DELETE_TIMER_OPCODE: u8 = 0x19;
/// Number of timer ids carried by a delete frame
pub const DELETE_TIMER_COUNT: u8 = 0x01;

pub const GET_STATE_LENGTH: u8 = 0x03;
pub const GET_STATE_OPCODE: u8 = 0x12;
pub const GET_STATE_TRAILER: u8 = 0x13;

/// Byte following the opcode in every command
pub const COMMAND_FLAG: u8 = 0x01;

/// Maximum encoded size of a timer name
pub const MAX_TIMER_NAME_LEN: usize = 16;

/// Minimum size of an inbound timer frame (fields before the name)
pub const TIMER_FRAME_MIN_LEN: usize = 7;
/// Offset of the switch flag in the first state response frame
pub const SWITCH_FLAG_OFFSET: usize = 7;

/// The single byte that ends a state response stream
pub const TERMINATOR: u8 = 0x00;

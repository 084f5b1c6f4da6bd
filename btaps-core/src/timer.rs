//! Timer schedule data types
//!
//! A BTaps switch stores a small table of named timers. Each timer switches
//! the outlet on at its start time and off at its end time, optionally
//! repeating on selected weekdays.

use crate::error::{BtapsError, BtapsResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Timer identifier; the device addresses timers with a single byte
pub type TimerId = u8;

/// Timers known on a device, keyed by id
pub type TimerRegistry = BTreeMap<TimerId, TimerDescriptor>;

/// Wall-clock time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Create a new time of day
    ///
    /// # Errors
    /// Returns `BtapsError::InvalidData` if hour > 23 or minute > 59
    pub fn new(hour: u8, minute: u8) -> BtapsResult<Self> {
        if hour > 23 || minute > 59 {
            return Err(BtapsError::InvalidData(format!(
                "Invalid time of day: {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Create a time of day without range checks
    ///
    /// Used for values read back from the device, which are reported as-is.
    pub fn from_raw(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

bitflags! {
    /// Weekday repeat mask
    ///
    /// Bits 1-7 select Monday through Sunday. Bit 0 is reserved; masks read
    /// from the device keep it as received (`from_bits_retain`), and
    /// `from_bits_truncate` clears it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RepeatDays: u8 {
        const MONDAY = 0x02;
        const TUESDAY = 0x04;
        const WEDNESDAY = 0x08;
        const THURSDAY = 0x10;
        const FRIDAY = 0x20;
        const SATURDAY = 0x40;
        const SUNDAY = 0x80;

        const WEEKDAYS = Self::MONDAY.bits()
            | Self::TUESDAY.bits()
            | Self::WEDNESDAY.bits()
            | Self::THURSDAY.bits()
            | Self::FRIDAY.bits();
        const WEEKEND = Self::SATURDAY.bits() | Self::SUNDAY.bits();
    }
}

/// A named schedule entry on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDescriptor {
    pub id: TimerId,
    pub name: String,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub enabled: bool,
    pub repeat_days: RepeatDays,
}

impl TimerDescriptor {
    /// Create a timer that does not repeat
    pub fn new(
        id: TimerId,
        name: impl Into<String>,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        enabled: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            start_time,
            end_time,
            enabled,
            repeat_days: RepeatDays::empty(),
        }
    }

    /// Set the weekday repeat mask
    pub fn with_repeat_days(mut self, repeat_days: RepeatDays) -> Self {
        self.repeat_days = repeat_days;
        self
    }
}

/// Switch flag and timer table as reported by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub enabled: bool,
    pub timers: TimerRegistry,
}

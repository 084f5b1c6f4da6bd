//! Device clock value for the date/time synchronisation command

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Date and time fields in the form the device clock expects
///
/// `month` is zero-based (January = 0) and `weekday` counts from
/// Sunday = 0, matching what the device firmware has always been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday: u8,
}

impl DeviceDateTime {
    /// Sample the local wall clock
    pub fn now() -> Self {
        Self::from(Local::now().naive_local())
    }
}

impl From<NaiveDateTime> for DeviceDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year().clamp(0, u16::MAX as i32) as u16,
            month: dt.month0() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            weekday: dt.weekday().num_days_from_sunday() as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_from_naive_date_time() {
        // 2024-03-17 was a Sunday
        let dt = NaiveDate::from_ymd_opt(2024, 3, 17)
            .unwrap()
            .and_hms_opt(21, 45, 9)
            .unwrap();
        let device = DeviceDateTime::from(dt);
        assert_eq!(device.year, 2024);
        assert_eq!(device.month, 2);
        assert_eq!(device.day, 17);
        assert_eq!(device.hour, 21);
        assert_eq!(device.minute, 45);
        assert_eq!(device.second, 9);
        assert_eq!(device.weekday, 0);
    }
}

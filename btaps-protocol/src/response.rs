//! Inbound frame decoding

use crate::constants::{TERMINATOR, TIMER_FRAME_MIN_LEN};
use crate::numeral::bad_hex_decode;
use btaps_core::{BtapsError, BtapsResult, RepeatDays, TimeOfDay, TimerDescriptor};

/// Check whether a frame is the state response terminator
pub fn is_terminator(frame: &[u8]) -> bool {
    frame.len() == 1 && frame[0] == TERMINATOR
}

/// Decode one timer entry of a state response
///
/// Layout: `id`, repeat mask, start hour, start minute, end hour, end minute
/// (all times bad-hex), enabled flag, then the UTF-8 name up to the end of
/// the frame. Trailing zero padding is stripped from the name.
///
/// # Errors
/// Returns `BtapsError::Decoding` if the frame is shorter than 7 bytes or a
/// time field is not a valid bad-hex value
pub fn decode_timer_frame(frame: &[u8]) -> BtapsResult<TimerDescriptor> {
    if frame.len() < TIMER_FRAME_MIN_LEN {
        return Err(BtapsError::Decoding(format!(
            "Timer frame too short: expected at least {} bytes, got {}",
            TIMER_FRAME_MIN_LEN,
            frame.len()
        )));
    }

    let start_time = TimeOfDay::from_raw(bad_hex_decode(frame[2])?, bad_hex_decode(frame[3])?);
    let end_time = TimeOfDay::from_raw(bad_hex_decode(frame[4])?, bad_hex_decode(frame[5])?);

    let name_bytes = &frame[TIMER_FRAME_MIN_LEN..];
    let name_end = name_bytes
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |pos| pos + 1);
    let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();

    Ok(TimerDescriptor {
        id: frame[0],
        name,
        start_time,
        end_time,
        enabled: frame[6] != 0,
        repeat_days: RepeatDays::from_bits_retain(frame[1]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator() {
        assert!(is_terminator(&[0x00]));
        assert!(!is_terminator(&[0x01]));
        assert!(!is_terminator(&[0x00, 0x00]));
        assert!(!is_terminator(&[]));
    }

    #[test]
    fn test_decode_timer_frame() {
        let timer = decode_timer_frame(&[1, 5, 16, 1, 17, 2, 1, b't', b'e', b's', b't']).unwrap();
        assert_eq!(timer.id, 1);
        assert_eq!(timer.name, "test");
        assert_eq!(timer.start_time, TimeOfDay::from_raw(10, 1));
        assert_eq!(timer.end_time, TimeOfDay::from_raw(11, 2));
        assert!(timer.enabled);
        assert_eq!(timer.repeat_days.bits(), 5);
    }

    #[test]
    fn test_decode_strips_padding() {
        let timer = decode_timer_frame(&[200, 0, 0, 0, 0, 0, 0, b'x', 0, 0, 0]).unwrap();
        assert_eq!(timer.id, 200);
        assert_eq!(timer.name, "x");
        assert!(!timer.enabled);
    }

    #[test]
    fn test_decode_without_name() {
        let timer = decode_timer_frame(&[4, 0, 0x23, 0x59, 0, 0, 1]).unwrap();
        assert_eq!(timer.name, "");
        assert_eq!(timer.start_time, TimeOfDay::from_raw(23, 59));
    }

    #[test]
    fn test_decode_short_frame() {
        assert!(matches!(
            decode_timer_frame(&[1, 5, 16, 1, 17, 2]),
            Err(BtapsError::Decoding(_))
        ));
    }

    #[test]
    fn test_decode_bad_time_field() {
        assert!(matches!(
            decode_timer_frame(&[1, 0, 0x1F, 0, 0, 0, 1]),
            Err(BtapsError::Decoding(_))
        ));
    }
}

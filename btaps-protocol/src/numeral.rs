//! "Bad hex" numeral encoding
//!
//! The device stores time fields as if the decimal digits were hex digits:
//! decimal 10 goes on the wire as `0x10`, decimal 59 as `0x59`. This is the
//! same nibble layout as packed BCD, but the device also uses it for fields
//! that do not fit in two digits.
//!
//! # Truncation
//! Only the low byte of the reinterpreted value is sent, so values with more
//! than two decimal digits keep their last two digits: a calendar year of
//! 2024 is sent as `0x24`. Whether the device expects a two-digit year or
//! silently loses the century is unknown, so the truncation is kept as is.

use btaps_core::{BtapsError, BtapsResult};

/// Encode a decimal value as a bad-hex byte
///
/// Round-trips exactly with [`bad_hex_decode`] for values in `0..=99`.
pub fn bad_hex_encode(value: u32) -> u8 {
    let tens = (value / 10 % 10) as u8;
    let ones = (value % 10) as u8;
    (tens << 4) | ones
}

/// Decode a bad-hex byte back to its decimal value
///
/// # Errors
/// Returns `BtapsError::Decoding` if either nibble is not a decimal digit
pub fn bad_hex_decode(byte: u8) -> BtapsResult<u8> {
    let tens = byte >> 4;
    let ones = byte & 0x0F;
    if tens > 9 || ones > 9 {
        return Err(BtapsError::Decoding(format!(
            "Byte 0x{:02X} is not a bad-hex decimal value",
            byte
        )));
    }
    Ok(tens * 10 + ones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_two_digit_domain() {
        for value in 0..=99u32 {
            assert_eq!(bad_hex_decode(bad_hex_encode(value)).unwrap() as u32, value);
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(bad_hex_encode(10), 0x10);
        assert_eq!(bad_hex_encode(59), 0x59);
        assert_eq!(bad_hex_decode(16).unwrap(), 10);
        assert_eq!(bad_hex_decode(17).unwrap(), 11);
        assert_eq!(bad_hex_decode(0x23).unwrap(), 23);
    }

    #[test]
    fn test_year_truncates_to_low_byte() {
        assert_eq!(bad_hex_encode(2024), 0x24);
        assert_eq!(bad_hex_encode(1999), 0x99);
        assert_eq!(bad_hex_encode(100), 0x00);
    }

    #[test]
    fn test_decode_rejects_hex_digits() {
        assert!(bad_hex_decode(0x1A).is_err());
        assert!(bad_hex_decode(0xA0).is_err());
        assert!(bad_hex_decode(0xFF).is_err());
    }
}

//! Binary-coded-decimal field decoding.
//!
//! The card encodes every time, position and signal field as packed BCD:
//! one decimal digit per nibble, low nibble first. This module decodes the
//! two register blocks the suite consumes — the 12-byte event/time capture
//! buffer and the 4-byte satellite signal slots. Decoding is pure and does
//! not touch hardware.

use thiserror::Error;

use crate::consts::EVENT_CAPTURE_LEN;

/// Errors produced while decoding BCD register fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BcdError {
    /// A nibble held a value outside 0-9.
    #[error("invalid BCD digit {digit:#x} in byte {index}")]
    InvalidDigit {
        /// Byte index within the decoded buffer.
        index: usize,
        /// Offending nibble value.
        digit: u8,
    },
}

/// Low nibble of a packed BCD byte.
pub fn lo_digit(byte: u8) -> u8 {
    byte & 0x0F
}

/// High nibble of a packed BCD byte.
pub fn hi_digit(byte: u8) -> u8 {
    byte >> 4
}

fn checked_digit(buf: &[u8], index: usize, high: bool) -> Result<u8, BcdError> {
    let digit = if high {
        hi_digit(buf[index])
    } else {
        lo_digit(buf[index])
    };
    if digit > 9 {
        return Err(BcdError::InvalidDigit { index, digit });
    }
    Ok(digit)
}

fn two_digits(buf: &[u8], index: usize) -> Result<u8, BcdError> {
    Ok(checked_digit(buf, index, true)? * 10 + checked_digit(buf, index, false)?)
}

/// A decoded 12-byte time capture, sub-microsecond through year.
///
/// The same layout backs the software time capture at `0xFC` and the event
/// time capture at `0x174`, so one decoder serves both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTimestamp {
    /// Four-digit year.
    pub year: u16,
    /// Day of year, 1-366.
    pub day_of_year: u16,
    /// Hour of day, UTC.
    pub hour: u8,
    /// Minute.
    pub minute: u8,
    /// Second.
    pub second: u8,
    /// Milliseconds.
    pub millisecond: u16,
    /// Microseconds.
    pub microsecond: u16,
    /// Hundreds of nanoseconds, a single digit (0-9).
    pub hundreds_ns: u8,
}

impl EventTimestamp {
    /// Decode a latched capture buffer.
    ///
    /// # Errors
    ///
    /// Returns `BcdError::InvalidDigit` if any populated nibble is not a
    /// decimal digit; unused filler nibbles are ignored.
    pub fn decode(buf: &[u8; EVENT_CAPTURE_LEN]) -> Result<Self, BcdError> {
        let microsecond = u16::from(checked_digit(buf, 1, false)?) * 100
            + u16::from(two_digits(buf, 0)?);
        // Millisecond digits straddle two bytes: hundreds/tens in byte 4,
        // units in the high nibble of byte 1.
        let millisecond = u16::from(checked_digit(buf, 4, true)?) * 100
            + u16::from(checked_digit(buf, 4, false)?) * 10
            + u16::from(checked_digit(buf, 1, true)?);

        let second = two_digits(buf, 5)?;
        let minute = two_digits(buf, 6)?;
        let hour = two_digits(buf, 7)?;

        let day_of_year =
            u16::from(checked_digit(buf, 9, false)?) * 100 + u16::from(two_digits(buf, 8)?);
        let year = u16::from(checked_digit(buf, 11, true)?) * 1000
            + u16::from(checked_digit(buf, 11, false)?) * 100
            + u16::from(two_digits(buf, 10)?);

        Ok(Self {
            year,
            day_of_year,
            hour,
            minute,
            second,
            millisecond,
            microsecond,
            hundreds_ns: checked_digit(buf, 3, true)?,
        })
    }

    /// Sub-second part in nanoseconds.
    pub fn subsec_nanos(&self) -> u32 {
        u32::from(self.millisecond) * 1_000_000
            + u32::from(self.microsecond) * 1_000
            + u32::from(self.hundreds_ns) * 100
    }
}

/// One decoded satellite signal slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatelliteSignal {
    /// Space-vehicle number of the tracked satellite; 0 when the slot is
    /// empty.
    pub sv_number: u8,
    /// Signal level in hundredths (e.g. `4725` for a level of 47.25).
    pub level_hundredths: u16,
}

impl SatelliteSignal {
    /// Decode a 4-byte signal strength slot.
    pub fn decode(buf: &[u8; 4]) -> Result<Self, BcdError> {
        let sv_number = two_digits(buf, 0)?;
        let level_hundredths = u16::from(two_digits(buf, 3)?) * 100
            + u16::from(checked_digit(buf, 2, true)?) * 10
            + u16::from(checked_digit(buf, 2, false)?);
        Ok(Self {
            sv_number,
            level_hundredths,
        })
    }

    /// Signal level as a float, for display.
    pub fn level(&self) -> f32 {
        f32::from(self.level_hundredths) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nibble_helpers() {
        assert_eq!(lo_digit(0x47), 7);
        assert_eq!(hi_digit(0x47), 4);
    }

    #[test]
    fn test_timestamp_decode() {
        // 2024, day 123, 14:36:52.847 291 µs, 500 ns.
        let buf: [u8; 12] = [
            0x91, // tens/units µs = 91
            0x72, // units ms = 7, hundreds µs = 2
            0x00, // filler
            0x50, // hundreds ns = 5
            0x84, // hundreds ms = 8, tens ms = 4
            0x52, // seconds = 52
            0x36, // minutes = 36
            0x14, // hours = 14
            0x23, // tens/units day = 23
            0x01, // hundreds day = 1
            0x24, // tens/units year = 24
            0x20, // thousands/hundreds year = 20
        ];
        let ts = EventTimestamp::decode(&buf).unwrap();
        assert_eq!(ts.year, 2024);
        assert_eq!(ts.day_of_year, 123);
        assert_eq!(ts.hour, 14);
        assert_eq!(ts.minute, 36);
        assert_eq!(ts.second, 52);
        assert_eq!(ts.millisecond, 847);
        assert_eq!(ts.microsecond, 291);
        assert_eq!(ts.hundreds_ns, 5);
        assert_eq!(ts.subsec_nanos(), 847_291_500);
    }

    #[test]
    fn test_timestamp_rejects_bad_digit() {
        let mut buf = [0u8; 12];
        buf[5] = 0x6A; // seconds units nibble is not a digit
        assert!(matches!(
            EventTimestamp::decode(&buf),
            Err(BcdError::InvalidDigit { index: 5, .. })
        ));
    }

    #[test]
    fn test_satellite_signal_decode() {
        // SV 12, level 47.25
        let sig = SatelliteSignal::decode(&[0x12, 0x00, 0x25, 0x47]).unwrap();
        assert_eq!(sig.sv_number, 12);
        assert_eq!(sig.level_hundredths, 4725);
        assert!((sig.level() - 47.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_satellite_signal_empty_slot() {
        let sig = SatelliteSignal::decode(&[0u8; 4]).unwrap();
        assert_eq!(sig.sv_number, 0);
        assert_eq!(sig.level_hundredths, 0);
    }
}

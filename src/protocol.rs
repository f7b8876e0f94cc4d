/*
 * This file is part of Segtherm.
 *
 * Copyright (C) 2025 Segtherm contributors
 *
 * Segtherm is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Segtherm is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Segtherm. If not, see <https://www.gnu.org/licenses/>.
 */

//! Wire protocol for the seven-segment display panel.
//!
//! The device consumes 64-byte HID output reports with a fixed layout:
//! a two-byte header, a command byte, four digit bytes (most significant
//! first), a handful of flag bytes, and an 8-bit checksum over everything
//! before it. Bytes 13..64 are always zero. Encoding is a pure function
//! of the reading, so every packet can be verified without hardware.

use std::fmt;

/// Total HID report length. Only the first [`PAYLOAD_LEN`] bytes carry data.
pub const REPORT_LEN: usize = 64;
/// Number of meaningful bytes in a report (header through checksum).
pub const PAYLOAD_LEN: usize = 13;

/// Fixed packet header, present in every report.
pub const HEADER: [u8; 2] = [0x3A, 0xB5];
/// Command byte: update the displayed value.
pub const CMD_DISPLAY: u8 = 0x01;
/// Command byte: initialize the panel after connecting.
pub const CMD_INIT: u8 = 0x20;
/// Digit value rendered as an empty position (leading-zero blanking).
pub const BLANK_DIGIT: u8 = 0x20;

const OFF_COMMAND: usize = 2;
const OFF_DIGITS: usize = 3;
const OFF_DECIMAL_POINT: usize = 7;
const OFF_UNIT: usize = 8;
const OFF_CPU_ICON: usize = 9;
const OFF_MODE: usize = 10;
const OFF_FLASHING: usize = 11;
const OFF_CHECKSUM: usize = 12;

/// Largest value the four digit positions can show.
const MAX_RAW: u32 = 9999;
// Temperature keeps at least the tens-of-tenths digit visible; fan speed
// may blank everything down to the last digit. The asymmetry is part of
// the device's display convention.
const TEMP_MAX_BLANKS: usize = 2;
const FAN_MAX_BLANKS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempUnit {
    Celsius,
    Fahrenheit,
}

/// One sensor value as shown on the panel. Produced fresh each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Temperature { value: f64, unit: TempUnit },
    FanSpeed { rpm: u64 },
}

/// A finished, checksummed HID report. Immutable after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet([u8; REPORT_LEN]);

impl Packet {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The four digit bytes, most significant first.
    pub fn digits(&self) -> [u8; 4] {
        [self.0[3], self.0[4], self.0[5], self.0[6]]
    }

    pub fn checksum_ok(&self) -> bool {
        self.0[OFF_CHECKSUM] == checksum(&self.0)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet[")?;
        for (i, b) in self.0[..PAYLOAD_LEN].iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        write!(f, " ..]")
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Encode a reading into a display packet.
///
/// Temperatures are shown in tenths (45.7 degrees becomes digits 0457
/// with the fixed decimal point), fan speeds as plain RPM. Values outside
/// the displayable range are clamped, never rejected, so this cannot fail.
pub fn encode(reading: Reading, flashing: bool) -> Packet {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = HEADER[0];
    buf[1] = HEADER[1];
    buf[OFF_COMMAND] = CMD_DISPLAY;

    match reading {
        Reading::Temperature { value, unit } => {
            let raw = clamp_raw((value * 10.0).round());
            write_digits(&mut buf, raw, TEMP_MAX_BLANKS);
            buf[OFF_DECIMAL_POINT] = 0x01;
            buf[OFF_UNIT] = match unit {
                TempUnit::Celsius => 0x01,
                TempUnit::Fahrenheit => 0x00,
            };
            buf[OFF_CPU_ICON] = 0x01;
            buf[OFF_MODE] = 0x00;
        }
        Reading::FanSpeed { rpm } => {
            let raw = rpm.min(MAX_RAW as u64) as u32;
            write_digits(&mut buf, raw, FAN_MAX_BLANKS);
            // decimal point, unit and CPU icon stay 0 for fan packets
            buf[OFF_MODE] = 0x01;
        }
    }
    buf[OFF_FLASHING] = u8::from(flashing);

    finalize(buf)
}

/// Encode the one-shot init packet sent right after connecting.
pub fn encode_init() -> Packet {
    let mut buf = [0u8; REPORT_LEN];
    buf[0] = HEADER[0];
    buf[1] = HEADER[1];
    buf[OFF_COMMAND] = CMD_INIT;
    finalize(buf)
}

fn clamp_raw(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, MAX_RAW as f64) as u32
}

fn write_digits(buf: &mut [u8; REPORT_LEN], raw: u32, max_blanks: usize) {
    debug_assert!(raw <= MAX_RAW);
    let mut digits = [
        (raw / 1000 % 10) as u8,
        (raw / 100 % 10) as u8,
        (raw / 10 % 10) as u8,
        (raw % 10) as u8,
    ];
    // Blank leading zeros left to right, stopping at the first non-zero
    // digit, never past the per-mode cap.
    for d in digits.iter_mut().take(max_blanks) {
        if *d != 0 {
            break;
        }
        *d = BLANK_DIGIT;
    }
    buf[OFF_DIGITS..OFF_DIGITS + 4].copy_from_slice(&digits);
}

fn checksum(buf: &[u8; REPORT_LEN]) -> u8 {
    buf[..OFF_CHECKSUM]
        .iter()
        .fold(0u8, |sum, b| sum.wrapping_add(*b))
}

fn finalize(mut buf: [u8; REPORT_LEN]) -> Packet {
    buf[OFF_CHECKSUM] = checksum(&buf);
    Packet(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_digits(packet: &Packet) -> u32 {
        packet
            .digits()
            .iter()
            .map(|&d| if d == BLANK_DIGIT { 0 } else { u32::from(d) })
            .fold(0, |acc, d| acc * 10 + d)
    }

    fn temp_c(value: f64) -> Reading {
        Reading::Temperature {
            value,
            unit: TempUnit::Celsius,
        }
    }

    #[test]
    fn test_display_packet_layout_45_7_celsius() {
        let packet = encode(temp_c(45.7), false);
        let bytes = packet.as_bytes();
        assert_eq!(bytes.len(), REPORT_LEN);
        assert_eq!(&bytes[0..3], &[0x3A, 0xB5, 0x01]);
        // 457 tenths: thousands digit blanked, then 4, 5, 7
        assert_eq!(packet.digits(), [0x20, 0x04, 0x05, 0x07]);
        assert_eq!(bytes[7], 0x01, "decimal point");
        assert_eq!(bytes[8], 0x01, "celsius unit");
        assert_eq!(bytes[9], 0x01, "cpu icon");
        assert_eq!(bytes[10], 0x00, "temperature mode");
        assert_eq!(bytes[11], 0x00, "not flashing");
        assert!(packet.checksum_ok());
        assert!(bytes[PAYLOAD_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_fahrenheit_unit_flag() {
        let packet = encode(
            Reading::Temperature {
                value: 98.6,
                unit: TempUnit::Fahrenheit,
            },
            false,
        );
        assert_eq!(packet.as_bytes()[8], 0x00);
        assert_eq!(packet.digits(), [0x20, 0x09, 0x08, 0x06]);
    }

    #[test]
    fn test_fan_packet_layout() {
        let packet = encode(Reading::FanSpeed { rpm: 1200 }, false);
        let bytes = packet.as_bytes();
        assert_eq!(packet.digits(), [0x01, 0x02, 0x00, 0x00]);
        assert_eq!(bytes[7], 0x00, "no decimal point");
        assert_eq!(bytes[8], 0x00, "unit unused");
        assert_eq!(bytes[9], 0x00, "no cpu icon");
        assert_eq!(bytes[10], 0x01, "fan mode");
        assert!(packet.checksum_ok());
    }

    #[test]
    fn test_temperature_blanking_capped_at_two() {
        // 7.0 C -> raw 70 -> digits 0,0,7,0; only the first two positions
        // may blank and the run stops at the 7 anyway.
        let packet = encode(temp_c(7.0), false);
        assert_eq!(packet.digits(), [0x20, 0x20, 0x07, 0x00]);

        // 0.0 C -> raw 0: positions three and four must stay numeric.
        let packet = encode(temp_c(0.0), false);
        assert_eq!(packet.digits(), [0x20, 0x20, 0x00, 0x00]);
    }

    #[test]
    fn test_blanking_stops_at_first_nonzero() {
        // raw 407: blank, 4, then the inner zero is displayed
        let packet = encode(temp_c(40.7), false);
        assert_eq!(packet.digits(), [0x20, 0x04, 0x00, 0x07]);
    }

    #[test]
    fn test_fan_blanking_up_to_three() {
        let packet = encode(Reading::FanSpeed { rpm: 5 }, false);
        assert_eq!(packet.digits(), [0x20, 0x20, 0x20, 0x05]);

        let packet = encode(Reading::FanSpeed { rpm: 0 }, false);
        assert_eq!(packet.digits(), [0x20, 0x20, 0x20, 0x00]);
    }

    #[test]
    fn test_temperature_round_trip() {
        for tenths in [0u32, 1, 9, 10, 457, 999, 1000, 5000, 9999] {
            let value = tenths as f64 / 10.0;
            let packet = encode(temp_c(value), false);
            assert_eq!(decode_digits(&packet), tenths, "value {}", value);
            assert!(packet.checksum_ok());
        }
    }

    #[test]
    fn test_fan_round_trip() {
        for rpm in [0u64, 1, 5, 42, 800, 1350, 9999] {
            let packet = encode(Reading::FanSpeed { rpm }, false);
            assert_eq!(decode_digits(&packet), rpm as u32, "rpm {}", rpm);
            assert!(packet.checksum_ok());
        }
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        assert_eq!(decode_digits(&encode(temp_c(-12.5), false)), 0);
        assert_eq!(decode_digits(&encode(temp_c(1234.5), false)), 9999);
        assert_eq!(decode_digits(&encode(temp_c(f64::NAN), false)), 0);
        assert_eq!(
            decode_digits(&encode(Reading::FanSpeed { rpm: 120_000 }, false)),
            9999
        );
    }

    #[test]
    fn test_rounding_to_tenths() {
        // 45.74 rounds down to 457 tenths, 45.75 up to 458
        assert_eq!(decode_digits(&encode(temp_c(45.74), false)), 457);
        assert_eq!(decode_digits(&encode(temp_c(45.75), false)), 458);
    }

    #[test]
    fn test_flashing_flag() {
        let packet = encode(temp_c(91.0), true);
        assert_eq!(packet.as_bytes()[11], 0x01);
        assert!(packet.checksum_ok());

        let packet = encode(Reading::FanSpeed { rpm: 900 }, true);
        assert_eq!(packet.as_bytes()[11], 0x01);
    }

    #[test]
    fn test_init_packet() {
        let packet = encode_init();
        let bytes = packet.as_bytes();
        assert_eq!(&bytes[0..3], &[0x3A, 0xB5, 0x20]);
        assert!(bytes[3..12].iter().all(|&b| b == 0));
        // checksum over 3A + B5 + 20
        assert_eq!(bytes[12], 0x0F);
        assert!(bytes[PAYLOAD_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_checksum_matches_sum_of_payload() {
        for packet in [
            encode(temp_c(45.7), false),
            encode(temp_c(0.0), true),
            encode(Reading::FanSpeed { rpm: 5 }, false),
            encode_init(),
        ] {
            let bytes = packet.as_bytes();
            let sum: u32 = bytes[..12].iter().map(|&b| u32::from(b)).sum();
            assert_eq!(bytes[12], (sum & 0xFF) as u8);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let a = encode(temp_c(45.7), false);
        let b = encode(temp_c(45.7), false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert!((celsius_to_fahrenheit(37.0) - 98.6).abs() < 1e-9);
    }
}

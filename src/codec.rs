//! Field codec: BCD wire bytes <-> plain integer clock/calendar fields.
//!
//! Each clock register keeps control bits next to its digits (clock halt in
//! the seconds register, 12/24 and AM/PM flags in the hours register), so
//! every field has its own width for the tens digit.

use core::ops::{BitOr, BitOrAssign};

use crate::registers::{CmdFlag, Register};
use crate::{CalendarRecord, HourFormat};

const UNITS_MASK: u8 = 0x0F;
const WEEKDAY_MASK: u8 = 0x07;

/// One clock/calendar register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Seconds,
    Minutes,
    Hours,
    Date,
    Month,
    Weekday,
    Year,
}

impl Field {
    /// All fields in clock burst order.
    pub const ALL: [Field; 7] = [
        Field::Seconds,
        Field::Minutes,
        Field::Hours,
        Field::Date,
        Field::Month,
        Field::Weekday,
        Field::Year,
    ];

    pub fn mask(self) -> FieldMask {
        match self {
            Field::Seconds => FieldMask::SECONDS,
            Field::Minutes => FieldMask::MINUTES,
            Field::Hours => FieldMask::HOURS,
            Field::Date => FieldMask::DATE,
            Field::Month => FieldMask::MONTH,
            Field::Weekday => FieldMask::WEEKDAY,
            Field::Year => FieldMask::YEAR,
        }
    }

    pub(crate) fn register(self) -> Register {
        match self {
            Field::Seconds => Register::SECONDS,
            Field::Minutes => Register::MINUTES,
            Field::Hours => Register::HOURS,
            Field::Date => Register::DATE,
            Field::Month => Register::MONTH,
            Field::Weekday => Register::DAY,
            Field::Year => Register::YEAR,
        }
    }

    // Bits of the tens digit, already shifted into the high nibble.
    // Hours uses the 24-hour layout here; see `encode_hours`.
    fn tens_mask(self) -> u8 {
        match self {
            Field::Seconds | Field::Minutes => 0x70,
            Field::Hours | Field::Date => 0x30,
            Field::Month => 0x10,
            Field::Year => 0xF0,
            Field::Weekday => 0x00,
        }
    }
}

/// Set of fields touched by a partial read or write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldMask(u8);

impl FieldMask {
    pub const NONE: FieldMask = FieldMask(0);
    pub const SECONDS: FieldMask = FieldMask(0x01);
    pub const MINUTES: FieldMask = FieldMask(0x02);
    pub const HOURS: FieldMask = FieldMask(0x04);
    pub const DATE: FieldMask = FieldMask(0x08);
    pub const MONTH: FieldMask = FieldMask(0x10);
    pub const WEEKDAY: FieldMask = FieldMask(0x20);
    pub const YEAR: FieldMask = FieldMask(0x40);
    pub const ALL: FieldMask = FieldMask(0x7F);

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.mask().0 != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl From<Field> for FieldMask {
    fn from(field: Field) -> Self {
        field.mask()
    }
}

impl BitOr for FieldMask {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        FieldMask(self.0 | other.0)
    }
}

impl BitOr<Field> for FieldMask {
    type Output = Self;

    fn bitor(self, other: Field) -> Self {
        self | other.mask()
    }
}

impl BitOrAssign for FieldMask {
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

fn to_bcd(value: u8, tens_mask: u8) -> u8 {
    (((value / 10) << 4) & tens_mask) | (value % 10)
}

fn from_bcd(byte: u8, tens_mask: u8) -> u8 {
    ((byte & tens_mask) >> 4) * 10 + (byte & UNITS_MASK)
}

/// Encodes a plain field value into its wire byte.
///
/// Control bits sharing the register are left cleared, so writing the seconds
/// field also starts the oscillator. Hours are encoded in 24-hour layout.
pub fn encode(field: Field, value: u8) -> u8 {
    match field {
        Field::Weekday => value & WEEKDAY_MASK,
        Field::Hours => encode_hours(value, HourFormat::TwentyFourHour),
        _ => to_bcd(value, field.tens_mask()),
    }
}

/// Decodes a wire byte into a plain field value, dropping control bits.
pub fn decode(field: Field, byte: u8) -> u8 {
    match field {
        Field::Weekday => byte & WEEKDAY_MASK,
        Field::Hours => decode_hours(byte).0,
        _ => from_bcd(byte, field.tens_mask()),
    }
}

/// Encodes an hour together with its 12/24-hour and AM/PM flags.
pub fn encode_hours(hours: u8, format: HourFormat) -> u8 {
    let h12 = CmdFlag::HOUR_12_BIT.bits();
    match format {
        HourFormat::TwentyFourHour => to_bcd(hours, 0x30),
        HourFormat::Am => h12 | to_bcd(hours, 0x10),
        HourFormat::Pm => h12 | CmdFlag::HOUR_PM_BIT.bits() | to_bcd(hours, 0x10),
    }
}

/// Splits an hours byte into the hour and its format.
///
/// In 12-hour mode bit 5 is the PM flag, in 24-hour mode it is the second
/// bit of the tens digit.
pub fn decode_hours(byte: u8) -> (u8, HourFormat) {
    if byte & CmdFlag::HOUR_12_BIT.bits() != 0 {
        let hours = from_bcd(byte, 0x10);
        if byte & CmdFlag::HOUR_PM_BIT.bits() != 0 {
            (hours, HourFormat::Pm)
        } else {
            (hours, HourFormat::Am)
        }
    } else {
        (from_bcd(byte, 0x30), HourFormat::TwentyFourHour)
    }
}

/// Stores a freshly read wire byte into the matching record field.
pub(crate) fn load(record: &mut CalendarRecord, field: Field, byte: u8) {
    match field {
        Field::Seconds => record.seconds = decode(field, byte),
        Field::Minutes => record.minutes = decode(field, byte),
        Field::Hours => {
            let (hours, format) = decode_hours(byte);
            record.hours = hours;
            record.format = format;
        }
        Field::Date => record.date = decode(field, byte),
        Field::Month => record.month = decode(field, byte),
        Field::Weekday => record.weekday = decode(field, byte),
        Field::Year => record.year = decode(field, byte),
    }
}

/// Wire byte for one field of a record, hours merged with the format flags.
pub(crate) fn store(record: &CalendarRecord, field: Field) -> u8 {
    match field {
        Field::Seconds => encode(field, record.seconds),
        Field::Minutes => encode(field, record.minutes),
        Field::Hours => encode_hours(record.hours, record.format),
        Field::Date => encode(field, record.date),
        Field::Month => encode(field, record.month),
        Field::Weekday => encode(field, record.weekday),
        Field::Year => encode(field, record.year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_fields_round_trip() {
        for value in 0..60 {
            assert_eq!(decode(Field::Seconds, encode(Field::Seconds, value)), value);
            assert_eq!(decode(Field::Minutes, encode(Field::Minutes, value)), value);
        }
        for value in 1..=31 {
            assert_eq!(decode(Field::Date, encode(Field::Date, value)), value);
        }
        for value in 1..=12 {
            assert_eq!(decode(Field::Month, encode(Field::Month, value)), value);
        }
        for value in 0..100 {
            assert_eq!(decode(Field::Year, encode(Field::Year, value)), value);
        }
    }

    #[test]
    fn known_wire_bytes() {
        assert_eq!(encode(Field::Seconds, 59), 0x59);
        assert_eq!(encode(Field::Date, 31), 0x31);
        assert_eq!(encode(Field::Month, 12), 0x12);
        assert_eq!(encode(Field::Year, 14), 0x14);
        assert_eq!(decode(Field::Year, 0x99), 99);
    }

    #[test]
    fn clock_halt_bit_is_not_part_of_seconds() {
        assert_eq!(decode(Field::Seconds, 0x80 | 0x42), 42);
        assert_eq!(encode(Field::Seconds, 42) & CmdFlag::CLOCK_HALT.bits(), 0);
    }

    #[test]
    fn hours_in_24_hour_mode_reach_23() {
        for hours in 0..24 {
            let byte = encode(Field::Hours, hours);
            assert_eq!(byte & CmdFlag::HOUR_12_BIT.bits(), 0);
            assert_eq!(decode_hours(byte), (hours, HourFormat::TwentyFourHour));
        }
        assert_eq!(encode(Field::Hours, 23), 0x23);
    }

    #[test]
    fn hours_in_12_hour_mode_keep_format() {
        for hours in 1..=12 {
            assert_eq!(decode_hours(encode_hours(hours, HourFormat::Am)), (hours, HourFormat::Am));
            assert_eq!(decode_hours(encode_hours(hours, HourFormat::Pm)), (hours, HourFormat::Pm));
        }
        assert_eq!(encode_hours(12, HourFormat::Pm), 0xB2);
        assert_eq!(encode_hours(11, HourFormat::Am), 0x91);
    }

    #[test]
    fn weekday_uses_three_bits_both_ways() {
        // read and write agree on the full 3-bit weekday range
        for weekday in 0..8 {
            assert_eq!(decode(Field::Weekday, encode(Field::Weekday, weekday)), weekday);
        }
        assert_eq!(decode(Field::Weekday, 0xFD), 5);
    }

    #[test]
    fn field_mask_selection() {
        let mask = FieldMask::SECONDS | Field::Year;
        assert!(mask.contains(Field::Seconds));
        assert!(mask.contains(Field::Year));
        assert!(!mask.contains(Field::Hours));
        assert!(Field::ALL.iter().all(|f| FieldMask::ALL.contains(*f)));
        assert!(Field::ALL.iter().all(|f| !FieldMask::NONE.contains(*f)));
    }
}

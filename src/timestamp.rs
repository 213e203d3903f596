//! Conversion between calendar records and Unix timestamps.
//!
//! The chip keeps a two-digit year, so records cover 2000-01-01 to
//! 2099-12-31. Inside that range every year divisible by four is a leap
//! year, which is all the leap logic needed here.

use crate::{CalendarRecord, Ds1302Error, HourFormat};

/// Seconds since 1970-01-01T00:00:00, timezone naive.
pub type Timestamp = u32;

/// 2000-01-01T00:00:00, the instant year `0` starts at.
pub const EPOCH: Timestamp = 946_684_800;

const SECONDS_PER_MINUTE: u32 = 60;
const SECONDS_PER_HOUR: u32 = 3_600;
const SECONDS_PER_DAY: u32 = 86_400;
const MAX_YEAR: u32 = 99;

// 2000-01-01 was a Saturday
const EPOCH_WEEKDAY: u32 = 6;

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap_year(year: u32) -> bool {
    year % 4 == 0
}

fn days_in_year(year: u32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn days_in_month(month_index: usize, year: u32) -> u32 {
    if month_index == 1 && is_leap_year(year) {
        DAYS_IN_MONTH[month_index] + 1
    } else {
        DAYS_IN_MONTH[month_index]
    }
}

/// Converts a record to a Unix timestamp.
///
/// 12-hour records are folded to 24 hours first. The weekday is ignored.
/// Fails with [`Ds1302Error::Overflow`] when the record lies past the end of
/// the two-digit year range, and with [`Ds1302Error::InvalidRecord`] when any
/// other field is not a real calendar value.
pub fn to_timestamp(record: &CalendarRecord) -> Result<Timestamp, Ds1302Error> {
    let year = u32::from(record.year);
    if year > MAX_YEAR {
        return Err(Ds1302Error::Overflow);
    }
    if record.format != HourFormat::TwentyFourHour && !(1..=12).contains(&record.hours) {
        return Err(Ds1302Error::InvalidRecord);
    }
    let record = record.to_24_hour();
    if record.hours > 23 || record.minutes > 59 || record.seconds > 59 {
        return Err(Ds1302Error::InvalidRecord);
    }
    if !(1..=12).contains(&record.month) {
        return Err(Ds1302Error::InvalidRecord);
    }
    let month = usize::from(record.month);
    if record.date == 0 || u32::from(record.date) > days_in_month(month - 1, year) {
        return Err(Ds1302Error::InvalidRecord);
    }

    // Whole years, plus one day per leap year already completed. Year 0 is
    // itself a leap year, so every year after it has seen at least one.
    let mut days = year * 365;
    if year > 0 {
        days += (year - 1) / 4 + 1;
    }

    days += (0..month - 1).map(|m| days_in_month(m, year)).sum::<u32>();
    days += u32::from(record.date - 1);

    let seconds = u64::from(days) * u64::from(SECONDS_PER_DAY)
        + u64::from(record.hours) * u64::from(SECONDS_PER_HOUR)
        + u64::from(record.minutes) * u64::from(SECONDS_PER_MINUTE)
        + u64::from(record.seconds)
        + u64::from(EPOCH);

    Timestamp::try_from(seconds).map_err(|_| Ds1302Error::Overflow)
}

/// Converts a Unix timestamp to a 24-hour record, weekday included
/// (`0` is Sunday).
///
/// Timestamps before 2000-01-01 fail with [`Ds1302Error::BeforeEpoch`],
/// timestamps from 2100-01-01 on with [`Ds1302Error::Overflow`].
pub fn from_timestamp(timestamp: Timestamp) -> Result<CalendarRecord, Ds1302Error> {
    if timestamp < EPOCH {
        return Err(Ds1302Error::BeforeEpoch);
    }
    let elapsed = timestamp - EPOCH;

    let seconds = elapsed % SECONDS_PER_MINUTE;
    let minutes = elapsed / SECONDS_PER_MINUTE % 60;
    let hours = elapsed / SECONDS_PER_HOUR % 24;
    let mut days = elapsed / SECONDS_PER_DAY;
    let weekday = (days + EPOCH_WEEKDAY) % 7;

    let mut year = 0;
    while days >= days_in_year(year) {
        days -= days_in_year(year);
        year += 1;
    }
    if year > MAX_YEAR {
        return Err(Ds1302Error::Overflow);
    }

    let mut month = 0;
    while days >= days_in_month(month, year) {
        days -= days_in_month(month, year);
        month += 1;
    }

    Ok(CalendarRecord {
        seconds: seconds as u8,
        minutes: minutes as u8,
        hours: hours as u8,
        weekday: weekday as u8,
        date: days as u8 + 1,
        month: month as u8 + 1,
        year: year as u8,
        format: HourFormat::TwentyFourHour,
    })
}

//! DS1302 real time clock-calendar platform agnostic driver
//!
//! # About
//!
//!The DS1302 trickle-charge timekeeping chip contains a real-time clock/calendar and 31 bytes of static RAM. It
//!communicates with a microprocessor via a simple three-wire serial interface: chip enable (CE), serial clock
//!(SCLK) and a bidirectional data line (I/O). This driver bit-bangs that interface over [`embedded-hal`] pins,
//!so it works on any MCU that can switch one GPIO between input and output.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//!
//!Datasheet: [DS1302](https://datasheets.maximintegrated.com/en/ds/DS1302.pdf)
//!
//! ## Driver features:
//! - Reading/setting the whole clock/calendar or any subset of its fields
//! - Burst transfers for whole records and RAM blocks
//! - 12-hour (AM/PM) or 24-hour format, switchable while the chip is running
//! - Conversion between calendar records and Unix timestamps
//! - 31 x 8 Battery-Backed General-Purpose RAM: bytes, blocks and C strings
//! - Programmable Trickle Charger, clock halt and write protection
//!
//! ## Usage
//!
//! ```ignore
//! use ds1302_rtc::{CalendarRecord, Config, HalDelay, DS1302};
//!
//! let mut rtc = DS1302::new(ce, sclk, io, HalDelay::new(delay), Config::default())?;
//! let mut now = CalendarRecord::default();
//! rtc.read_all(&mut now)?;
//! let unix = ds1302_rtc::to_timestamp(&now)?;
//! ```

#![cfg_attr(not(test), no_std)]
#![allow(non_camel_case_types)]

#[cfg(all(feature = "rp2040", feature = "rp2350"))]
compile_error!("You must not enable both the `rp2040` and `rp2350` Cargo features.");

mod codec;
mod ram;
mod registers;
#[cfg(any(feature = "rp2040", feature = "rp2350"))]
mod rp;
mod timestamp;

pub use crate::codec::{decode, decode_hours, encode, encode_hours, Field, FieldMask};
pub use crate::ram::RAM_SIZE;
pub use crate::registers::{Ds, Rs, TrickleCharger};
#[cfg(any(feature = "rp2040", feature = "rp2350"))]
pub use crate::rp::{DirectionError, RpIoLine};
pub use crate::timestamp::{from_timestamp, to_timestamp, Timestamp, EPOCH};

use crate::registers::{CmdFlag, Register};

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use fugit::ExtU32;

// tCC: CE to first clock edge, and CE inactive time between transactions
const CE_SETUP_US: u32 = 4;
// tCH / tCL, with margin for slow supplies
const HALF_CLOCK_US: u32 = 2;

/// DS1302 error
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ds1302Error {
    /// An argument the driver cannot work with, such as an empty buffer.
    Parameter,
    /// The clock halt flag did not clear during initialization.
    Unknown,
    ClockError,
    ReadError,
    WriteError,
    ChipSelectError,
    /// A RAM offset or block reaches outside the 31 byte window.
    OutOfRange,
    /// The timestamp lies before 2000-01-01T00:00:00.
    BeforeEpoch,
    /// The value lies past the end of the two-digit year range.
    Overflow,
    /// A record field lies outside its calendar range, such as month 13 or
    /// February 30.
    InvalidRecord,
}

impl fmt::Display for Ds1302Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Parameter => f.write_str("invalid parameter"),
            Self::Unknown => f.write_str("clock halt flag could not be cleared"),
            Self::ClockError => f.write_str("SCLK line failure"),
            Self::ReadError => f.write_str("I/O line read failure"),
            Self::WriteError => f.write_str("I/O line write failure"),
            Self::ChipSelectError => f.write_str("CE line failure"),
            Self::OutOfRange => f.write_str("RAM access outside of the RAM window"),
            Self::BeforeEpoch => f.write_str("timestamp before 2000-01-01"),
            Self::Overflow => f.write_str("date outside of the years 2000 to 2099"),
            Self::InvalidRecord => f.write_str("calendar record field out of range"),
        }
    }
}

/// For timing `ds1302` uses [fugit](https://lib.rs/crates/fugit) crate which only provides `Duration` and `Instant` types.
/// It does not provide any clock or timer traits.
/// Therefore `ds1302` has its own `Delay` trait that provides all timing capabilities that are needed for the library.
/// User must implement this trait for the timer by itself, or wrap an `embedded-hal` delay in [`HalDelay`].
pub trait Delay<const TIMER_HZ: u32> {
    /// An error that might happen during waiting
    type Error;

    /// Return current time `Instant`
    fn now(&mut self) -> fugit::TimerInstantU32<TIMER_HZ>;

    /// Start countdown with a `duration`
    fn start(&mut self, duration: fugit::TimerDurationU32<TIMER_HZ>) -> Result<(), Self::Error>;

    /// Wait until countdown `duration` has expired.
    /// Must return `nb::Error::WouldBlock` if countdown `duration` is not yet over.
    /// Must return `OK(())` as soon as countdown `duration` has expired.
    fn wait(&mut self) -> nb::Result<(), Self::Error>;
}

/// [`Delay`] on top of any blocking `embedded-hal` delay, ticking at 1 MHz.
///
/// `wait` performs the whole countdown at once, and `now` counts the
/// microseconds waited so far.
pub struct HalDelay<D> {
    delay: D,
    pending: u32,
    elapsed: u32,
}

impl<D: DelayNs> HalDelay<D> {
    pub fn new(delay: D) -> Self {
        HalDelay {
            delay,
            pending: 0,
            elapsed: 0,
        }
    }

    pub fn free(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> Delay<1_000_000> for HalDelay<D> {
    type Error = core::convert::Infallible;

    fn now(&mut self) -> fugit::TimerInstantU32<1_000_000> {
        fugit::TimerInstantU32::from_ticks(self.elapsed)
    }

    fn start(&mut self, duration: fugit::TimerDurationU32<1_000_000>) -> Result<(), Self::Error> {
        self.pending = duration.ticks();
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if self.pending > 0 {
            self.delay.delay_us(self.pending);
            self.elapsed = self.elapsed.wrapping_add(self.pending);
            self.pending = 0;
        }
        Ok(())
    }
}

/// The bidirectional I/O line.
///
/// The driver drives it while shifting command and data bytes out and
/// releases it while the chip shifts data back.
pub trait IoLine: InputPin + OutputPin {
    /// Configure the line to be driven by the MCU.
    fn set_as_output(&mut self) -> Result<(), Self::Error>;

    /// Release the line so the chip can drive it.
    fn set_as_input(&mut self) -> Result<(), Self::Error>;
}

/// Driver options.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Use burst transactions for whole clock records and RAM blocks.
    pub burst: bool,
    /// Clear a set clock halt flag when the driver is created.
    pub start_clock: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            burst: true,
            start_clock: true,
        }
    }
}

impl Config {
    pub fn burst(mut self, burst: bool) -> Self {
        self.burst = burst;
        self
    }

    pub fn start_clock(mut self, start_clock: bool) -> Self {
        self.start_clock = start_clock;
        self
    }
}

///Hour format: 12-hour (AM/PM) or 24-hour
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Hour24,
    Hour12,
}

/// How the `hours` field of a record is to be read.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourFormat {
    #[default]
    TwentyFourHour,
    Am,
    Pm,
}

/// Decoded clock/calendar snapshot.
///
/// `hours` is 0-23 for [`HourFormat::TwentyFourHour`] and 1-12 otherwise.
/// `weekday` is the chip's 3-bit day register, `year` counts from 2000.
#[derive(Debug, Default, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarRecord {
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub weekday: u8,
    pub date: u8,
    pub month: u8,
    pub year: u8,
    pub format: HourFormat,
}

impl CalendarRecord {
    /// The same instant with hours in 24-hour format.
    pub fn to_24_hour(&self) -> Self {
        let hours = match self.format {
            HourFormat::TwentyFourHour => self.hours,
            HourFormat::Am => self.hours % 12,
            HourFormat::Pm => self.hours % 12 + 12,
        };
        CalendarRecord {
            hours,
            format: HourFormat::TwentyFourHour,
            ..*self
        }
    }

    /// The same instant with hours in 12-hour format.
    pub fn to_12_hour(&self) -> Self {
        let hours = self.to_24_hour().hours;
        let format = if hours >= 12 {
            HourFormat::Pm
        } else {
            HourFormat::Am
        };
        let hours = match hours % 12 {
            0 => 12,
            h => h,
        };
        CalendarRecord {
            hours,
            format,
            ..*self
        }
    }

    /// The year as a full calendar year.
    pub fn full_year(&self) -> u16 {
        2000 + u16::from(self.year)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Bus {
    Idle,
    Transfer,
}

///Input. CE signal must be asserted high during a read or a write
///Note: Previous data sheet revisions referred to CE as RST
pub struct DS1302<CE, SCLK, IO, D, const TIMER_HZ: u32> {
    ce: CE,
    sclk: SCLK,
    io: IO,
    delay: D,
    config: Config,
    bus: Bus,
}

impl<CE, SCLK, IO, D, const TIMER_HZ: u32> DS1302<CE, SCLK, IO, D, TIMER_HZ>
where
    CE: OutputPin,
    SCLK: OutputPin,
    IO: IoLine,
    D: Delay<TIMER_HZ>,
{
    /// Takes the three lines, drives them low and, if `config.start_clock`
    /// is set, makes sure the oscillator runs.
    pub fn new(ce: CE, sclk: SCLK, io: IO, delay: D, config: Config) -> Result<Self, Ds1302Error> {
        let mut ds1302 = DS1302 {
            ce,
            sclk,
            io,
            delay,
            config,
            bus: Bus::Idle,
        };
        ds1302.io.set_as_output().map_err(|_| Ds1302Error::WriteError)?;
        ds1302.io.set_low().map_err(|_| Ds1302Error::WriteError)?;
        ds1302.ce.set_low().map_err(|_| Ds1302Error::ChipSelectError)?;
        ds1302.sclk.set_low().map_err(|_| Ds1302Error::ClockError)?;

        if config.start_clock {
            // Check CLOCK HALT FLAG bit
            let byte = ds1302.read_reg(Register::SECONDS.read())?;
            if (byte & CmdFlag::CLOCK_HALT.bits()) != 0 {
                #[cfg(feature = "defmt")]
                defmt::debug!("ds1302: clock halted, starting oscillator");
                ds1302.write_reg(Register::SECONDS.write(), byte & !CmdFlag::CLOCK_HALT.bits())?;
                let byte = ds1302.read_reg(Register::SECONDS.read())?;
                if (byte & CmdFlag::CLOCK_HALT.bits()) != 0 {
                    return Err(Ds1302Error::Unknown);
                }
            }
        }
        Ok(ds1302)
    }

    /// Gives back the lines and the delay.
    pub fn release(self) -> (CE, SCLK, IO, D) {
        (self.ce, self.sclk, self.io, self.delay)
    }

    pub fn config(&self) -> Config {
        self.config
    }

    fn settle(&mut self, duration: fugit::TimerDurationU32<TIMER_HZ>) {
        self.delay.start(duration).ok();
        nb::block!(self.delay.wait()).ok();
    }

    // Bits go out LSB first and are latched by the chip on the rising edge.
    fn write_byte(&mut self, byte: u8) -> Result<(), Ds1302Error> {
        self.io.set_as_output().map_err(|_| Ds1302Error::WriteError)?;
        for i in 0..8 {
            self.io
                .set_state((((byte >> i) & 1) == 1).into())
                .map_err(|_| Ds1302Error::WriteError)?;
            self.sclk.set_low().map_err(|_| Ds1302Error::ClockError)?;
            self.settle(HALF_CLOCK_US.micros());
            self.sclk.set_high().map_err(|_| Ds1302Error::ClockError)?;
            self.settle(HALF_CLOCK_US.micros());
        }
        Ok(())
    }

    // The chip shifts the next bit out on each falling edge, LSB first.
    fn read_byte(&mut self) -> Result<u8, Ds1302Error> {
        self.io.set_as_input().map_err(|_| Ds1302Error::ReadError)?;
        let mut data = 0;
        for i in 0..8 {
            self.sclk.set_high().map_err(|_| Ds1302Error::ClockError)?;
            self.settle(HALF_CLOCK_US.micros());
            self.sclk.set_low().map_err(|_| Ds1302Error::ClockError)?;
            self.settle(HALF_CLOCK_US.micros());
            if self.io.is_high().map_err(|_| Ds1302Error::ReadError)? {
                data |= 1 << i;
            }
        }
        Ok(data)
    }

    // Dropping CE first resets whatever transfer the chip was in.
    fn start(&mut self, command: u8) -> Result<(), Ds1302Error> {
        if self.bus == Bus::Transfer {
            #[cfg(feature = "defmt")]
            defmt::debug!("ds1302: restarting aborted transaction");
        }
        self.stop()?;
        self.ce
            .set_high()
            .map_err(|_| Ds1302Error::ChipSelectError)?;
        self.bus = Bus::Transfer;
        self.settle(CE_SETUP_US.micros());
        #[cfg(feature = "defmt")]
        defmt::trace!("ds1302: command {=u8:#x}", command);
        self.write_byte(command)
    }

    fn stop(&mut self) -> Result<(), Ds1302Error> {
        self.ce
            .set_low()
            .map_err(|_| Ds1302Error::ChipSelectError)?;
        self.sclk.set_low().map_err(|_| Ds1302Error::ClockError)?;
        self.bus = Bus::Idle;
        self.settle(CE_SETUP_US.micros());
        Ok(())
    }

    /// Runs one CE-bracketed transaction: the command byte, then `body`
    /// moving the data bytes. Nothing else may touch the lines meanwhile.
    fn transaction<R>(
        &mut self,
        command: u8,
        body: impl FnOnce(&mut Self) -> Result<R, Ds1302Error>,
    ) -> Result<R, Ds1302Error> {
        critical_section::with(|_| {
            let result = self.start(command).and_then(|_| body(self));
            // CE comes down even after a failed start; the first error wins
            let stopped = self.stop();
            result.and_then(|r| stopped.map(|_| r))
        })
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Ds1302Error> {
        self.transaction(reg, |ds| ds.read_byte())
    }

    fn write_reg(&mut self, reg: u8, byte: u8) -> Result<(), Ds1302Error> {
        self.transaction(reg, |ds| ds.write_byte(byte))
    }

    /// Reads every field into `record`, in one burst when enabled.
    pub fn read_all(&mut self, record: &mut CalendarRecord) -> Result<(), Ds1302Error> {
        if self.config.burst {
            self.transaction(Register::CLKBURS.read(), |ds| {
                for field in Field::ALL {
                    let byte = ds.read_byte()?;
                    codec::load(record, field, byte);
                }
                Ok(())
            })
        } else {
            self.read_fields(record, FieldMask::ALL)
        }
    }

    /// Reads the fields selected by `mask`, one register transaction each.
    /// Other fields of `record` are left alone.
    pub fn read_fields(&mut self, record: &mut CalendarRecord, mask: FieldMask) -> Result<(), Ds1302Error> {
        for field in Field::ALL {
            if mask.contains(field) {
                let byte = self.read_reg(field.register().read())?;
                codec::load(record, field, byte);
            }
        }
        Ok(())
    }

    /// Writes every field of `record`, in one burst when enabled.
    ///
    /// A clock burst must also fill the control register, so the burst
    /// variant clears write protection.
    pub fn write_all(&mut self, record: &CalendarRecord) -> Result<(), Ds1302Error> {
        if self.config.burst {
            self.transaction(Register::CLKBURS.write(), |ds| {
                for field in Field::ALL {
                    ds.write_byte(codec::store(record, field))?;
                }
                ds.write_byte(0)
            })
        } else {
            self.write_fields(record, FieldMask::ALL)
        }
    }

    /// Writes the fields selected by `mask`, one register transaction each.
    pub fn write_fields(&mut self, record: &CalendarRecord, mask: FieldMask) -> Result<(), Ds1302Error> {
        for field in Field::ALL {
            if mask.contains(field) {
                self.write_reg(field.register().write(), codec::store(record, field))?;
            }
        }
        Ok(())
    }

    ///Switch between 12-hour (AM/PM) and 24-hour mode, keeping the current hour
    pub fn set_clock_mode(&mut self, mode: Mode) -> Result<(), Ds1302Error> {
        let mut record = CalendarRecord::default();
        self.read_fields(&mut record, FieldMask::HOURS)?; // save current hours data
        let converted = match (record.format, mode) {
            (HourFormat::TwentyFourHour, Mode::Hour12) => record.to_12_hour(),
            (HourFormat::Am | HourFormat::Pm, Mode::Hour24) => record.to_24_hour(),
            _ => return Ok(()),
        };
        self.write_fields(&converted, FieldMask::HOURS)
    }

    /// Configure the trickle-charge register.
    pub fn set_charger(&mut self, charger: TrickleCharger) -> Result<(), Ds1302Error> {
        self.write_reg(Register::TCS.write(), charger.into())
    }

    /// Get the configuration of the trickle-charge register.
    pub fn charger(&mut self) -> Result<TrickleCharger, Ds1302Error> {
        self.read_reg(Register::TCS.read()).map(TrickleCharger::from)
    }

    /// Whether the oscillator is stopped.
    pub fn halt(&mut self) -> Result<bool, Ds1302Error> {
        let seconds = self.read_reg(Register::SECONDS.read())?;
        Ok(seconds & CmdFlag::CLOCK_HALT.bits() != 0)
    }

    /// Stop (`true`) or restart (`false`) the oscillator, keeping the seconds.
    pub fn set_halt(&mut self, halted: bool) -> Result<(), Ds1302Error> {
        let mut seconds = self.read_reg(Register::SECONDS.read())?;
        if halted {
            seconds |= CmdFlag::CLOCK_HALT.bits();
        } else {
            seconds &= !CmdFlag::CLOCK_HALT.bits();
        }
        self.write_reg(Register::SECONDS.write(), seconds)
    }

    /// Whether writes to the clock, charger and RAM registers are blocked.
    pub fn protection(&mut self) -> Result<bool, Ds1302Error> {
        let wp = self.read_reg(Register::WP.read())?;
        Ok(wp & CmdFlag::WRITE_PROTECT.bits() != 0)
    }

    /// protection(true) -> Enable Write_Protect
    /// protection(false) -> Disable Write_Protect
    pub fn set_protection(&mut self, enable: bool) -> Result<(), Ds1302Error> {
        let wp = if enable {
            CmdFlag::WRITE_PROTECT.bits()
        } else {
            0
        };
        self.write_reg(Register::WP.write(), wp)
    }
}

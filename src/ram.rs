//! 31 x 8 battery-backed RAM.
//!
//! Callers address the RAM with a zero-based byte offset. On the wire each
//! byte owns a read and a write command, so byte `n` sits at command
//! `0xC1 + 2n` (read) and `0xC0 + 2n` (write).

use core::ffi::CStr;

use embedded_hal::digital::OutputPin;

use crate::registers::Register;
use crate::{Delay, Ds1302Error, IoLine, DS1302};

/// Size of the RAM window in bytes.
pub const RAM_SIZE: usize = 31;

// Blocks longer than this that start at offset 0 go out as one burst.
const BURST_THRESHOLD: usize = 2;

#[derive(Copy, Clone)]
enum Direction {
    Read,
    Write,
}

/// Command byte for RAM byte `offset`, checked against the window bounds
/// for the given direction.
fn address(offset: usize, direction: Direction) -> Result<u8, Ds1302Error> {
    let (first, last) = match direction {
        Direction::Read => (Register::RAM.read(), Register::RAMEND.read()),
        Direction::Write => (Register::RAM.write(), Register::RAMEND.write()),
    };
    let addr = offset
        .checked_mul(2)
        .and_then(|o| o.checked_add(usize::from(first)))
        .ok_or(Ds1302Error::OutOfRange)?;
    if (usize::from(first)..=usize::from(last)).contains(&addr) {
        Ok(addr as u8)
    } else {
        #[cfg(feature = "defmt")]
        defmt::warn!("ds1302: RAM offset {=usize} outside of the window", offset);
        Err(Ds1302Error::OutOfRange)
    }
}

/// First command byte of a `len` byte block; both ends must be inside.
fn span(offset: usize, len: usize, direction: Direction) -> Result<u8, Ds1302Error> {
    let first = address(offset, direction)?;
    if len > 1 {
        address(offset.saturating_add(len - 1), direction)?;
    }
    Ok(first)
}

fn use_burst(burst: bool, offset: usize, len: usize) -> bool {
    burst && offset == 0 && len > BURST_THRESHOLD
}

impl<CE, SCLK, IO, D, const TIMER_HZ: u32> DS1302<CE, SCLK, IO, D, TIMER_HZ>
where
    CE: OutputPin,
    SCLK: OutputPin,
    IO: IoLine,
    D: Delay<TIMER_HZ>,
{
    /// Read one RAM byte, offset 0..=30.
    pub fn read_ram(&mut self, offset: usize) -> Result<u8, Ds1302Error> {
        let addr = address(offset, Direction::Read)?;
        self.read_reg(addr)
    }

    /// Write one RAM byte, offset 0..=30.
    pub fn write_ram(&mut self, offset: usize, value: u8) -> Result<(), Ds1302Error> {
        let addr = address(offset, Direction::Write)?;
        self.write_reg(addr, value)
    }

    /// Fill `buf` from RAM starting at `offset`.
    ///
    /// The whole block must fit the window, otherwise nothing is read.
    pub fn read_ram_block(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Ds1302Error> {
        let mut addr = span(offset, buf.len(), Direction::Read)?;
        if use_burst(self.config.burst, offset, buf.len()) {
            self.transaction(Register::RAMBURS.read(), |ds| {
                for byte in buf.iter_mut() {
                    *byte = ds.read_byte()?;
                }
                Ok(())
            })
        } else {
            for byte in buf.iter_mut() {
                *byte = self.read_reg(addr)?;
                addr += 2;
            }
            Ok(())
        }
    }

    /// Write `data` to RAM starting at `offset`.
    ///
    /// The whole block must fit the window, otherwise nothing is written.
    pub fn write_ram_block(&mut self, offset: usize, data: &[u8]) -> Result<(), Ds1302Error> {
        self.write_span(offset, data)
    }

    /// Write a C string, terminator included, starting at `offset`.
    pub fn write_ram_str(&mut self, offset: usize, s: &CStr) -> Result<(), Ds1302Error> {
        self.write_span(offset, s.to_bytes_with_nul())
    }

    /// Read a C string starting at `offset` into `buf`.
    ///
    /// Stops at the terminator, at the end of the window or when `buf` has
    /// one byte left. `buf` always ends up terminated; the returned length
    /// excludes the terminator.
    pub fn read_ram_str(&mut self, offset: usize, buf: &mut [u8]) -> Result<usize, Ds1302Error> {
        if buf.is_empty() {
            return Err(Ds1302Error::Parameter);
        }
        let mut addr = address(offset, Direction::Read)?;
        let max = (buf.len() - 1).min(RAM_SIZE - offset);

        let mut len = 0;
        while len < max {
            let byte = self.read_reg(addr)?;
            buf[len] = byte;
            if byte == 0 {
                return Ok(len);
            }
            len += 1;
            addr += 2;
        }
        buf[len] = 0;
        Ok(len)
    }

    fn write_span(&mut self, offset: usize, data: &[u8]) -> Result<(), Ds1302Error> {
        let mut addr = span(offset, data.len(), Direction::Write)?;
        if use_burst(self.config.burst, offset, data.len()) {
            self.transaction(Register::RAMBURS.write(), |ds| {
                for byte in data {
                    ds.write_byte(*byte)?;
                }
                Ok(())
            })
        } else {
            for byte in data {
                self.write_reg(addr, *byte)?;
                addr += 2;
            }
            Ok(())
        }
    }
}

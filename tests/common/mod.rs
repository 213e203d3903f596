//! A DS1302 model driven by pin transitions.
//!
//! The model latches command and data bits on rising SCLK edges, shifts read
//! data out on falling edges, follows burst addressing and honours the write
//! protect bit. It does not tick.

#![allow(dead_code)]

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use ds1302_rtc::{Config, HalDelay, IoLine, DS1302};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;

pub const SECONDS: usize = 0;
pub const MINUTES: usize = 1;
pub const HOURS: usize = 2;
pub const DATE: usize = 3;
pub const MONTH: usize = 4;
pub const WEEKDAY: usize = 5;
pub const YEAR: usize = 6;
pub const WP: usize = 7;
pub const TCS: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq)]
enum Target {
    Clock,
    Ram,
}

#[derive(Debug, Copy, Clone, Default)]
enum Phase {
    #[default]
    Idle,
    Command {
        shift: u8,
        bits: u8,
    },
    Write {
        target: Target,
        index: usize,
        burst: bool,
        shift: u8,
        bits: u8,
    },
    Read {
        target: Target,
        index: usize,
        burst: bool,
        bits: u8,
    },
    Ignore,
}

#[derive(Debug, Default)]
pub struct Chip {
    /// Clock registers by address: seconds..year, write protect, trickle charger.
    pub clock: [u8; 9],
    pub ram: [u8; 31],
    /// Every command byte received.
    pub commands: Vec<u8>,
    /// Number of CE assertions.
    pub transactions: usize,
    ce: bool,
    sclk: bool,
    io_driven: bool,
    io_level: bool,
    out: bool,
    phase: Phase,
}

fn decode_command(command: u8) -> Phase {
    if command & 0x80 == 0 {
        return Phase::Ignore;
    }
    let target = if command & 0x40 != 0 {
        Target::Ram
    } else {
        Target::Clock
    };
    let addr = usize::from((command >> 1) & 0x1F);
    let burst = addr == 31;
    let index = if burst { 0 } else { addr };
    if command & 1 == 1 {
        Phase::Read {
            target,
            index,
            burst,
            bits: 0,
        }
    } else {
        Phase::Write {
            target,
            index,
            burst,
            shift: 0,
            bits: 0,
        }
    }
}

impl Chip {
    fn fetch(&self, target: Target, index: usize) -> u8 {
        match target {
            Target::Clock => self.clock.get(index).copied().unwrap_or(0),
            Target::Ram => self.ram.get(index).copied().unwrap_or(0),
        }
    }

    fn commit(&mut self, target: Target, index: usize, byte: u8) {
        let protected = self.clock[WP] & 0x80 != 0;
        match target {
            Target::Clock if index == WP => self.clock[WP] = byte,
            _ if protected => {}
            Target::Clock => {
                if let Some(reg) = self.clock.get_mut(index) {
                    *reg = byte;
                }
            }
            Target::Ram => {
                if let Some(reg) = self.ram.get_mut(index) {
                    *reg = byte;
                }
            }
        }
    }

    fn set_ce(&mut self, high: bool) {
        if high && !self.ce {
            self.transactions += 1;
            self.phase = Phase::Command { shift: 0, bits: 0 };
        }
        if !high {
            self.phase = Phase::Idle;
        }
        self.ce = high;
    }

    fn set_sclk(&mut self, high: bool) {
        let rising = high && !self.sclk;
        let falling = !high && self.sclk;
        self.sclk = high;
        if !self.ce {
            return;
        }
        if rising {
            self.rising_edge();
        } else if falling {
            self.falling_edge();
        }
    }

    fn rising_edge(&mut self) {
        let bit = u8::from(self.io_driven && self.io_level);
        match self.phase {
            Phase::Command { shift, bits } => {
                let shift = shift | (bit << bits);
                if bits == 7 {
                    self.commands.push(shift);
                    self.phase = decode_command(shift);
                } else {
                    self.phase = Phase::Command {
                        shift,
                        bits: bits + 1,
                    };
                }
            }
            Phase::Write {
                target,
                index,
                burst,
                shift,
                bits,
            } => {
                let shift = shift | (bit << bits);
                if bits == 7 {
                    self.commit(target, index, shift);
                    self.phase = if burst {
                        Phase::Write {
                            target,
                            index: index + 1,
                            burst,
                            shift: 0,
                            bits: 0,
                        }
                    } else {
                        Phase::Ignore
                    };
                } else {
                    self.phase = Phase::Write {
                        target,
                        index,
                        burst,
                        shift,
                        bits: bits + 1,
                    };
                }
            }
            _ => {}
        }
    }

    fn falling_edge(&mut self) {
        if let Phase::Read {
            target,
            index,
            burst,
            bits,
        } = self.phase
        {
            self.out = (self.fetch(target, index) >> bits) & 1 == 1;
            self.phase = if bits == 7 {
                Phase::Read {
                    target,
                    index: if burst { index + 1 } else { index },
                    burst,
                    bits: 0,
                }
            } else {
                Phase::Read {
                    target,
                    index,
                    burst,
                    bits: bits + 1,
                }
            };
        }
    }

    fn sample(&self) -> bool {
        if self.io_driven {
            self.io_level
        } else {
            matches!(self.phase, Phase::Read { .. }) && self.out
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub enum Wire {
    Ce,
    Sclk,
    Io,
}

/// One of the three lines, wired to a shared [`Chip`].
pub struct SimPin {
    chip: Rc<RefCell<Chip>>,
    wire: Wire,
}

impl SimPin {
    pub fn new(chip: &Rc<RefCell<Chip>>, wire: Wire) -> Self {
        SimPin {
            chip: chip.clone(),
            wire,
        }
    }

    fn drive(&mut self, level: bool) {
        let mut chip = self.chip.borrow_mut();
        match self.wire {
            Wire::Ce => chip.set_ce(level),
            Wire::Sclk => chip.set_sclk(level),
            Wire::Io => chip.io_level = level,
        }
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.chip.borrow().sample())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl IoLine for SimPin {
    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        self.chip.borrow_mut().io_driven = true;
        Ok(())
    }

    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.chip.borrow_mut().io_driven = false;
        Ok(())
    }
}

pub type Rtc = DS1302<SimPin, SimPin, SimPin, HalDelay<NoopDelay>, 1_000_000>;

pub fn delay() -> HalDelay<NoopDelay> {
    HalDelay::new(NoopDelay::new())
}

/// Driver wired to `chip`; the command log starts empty after `new`.
pub fn connect(chip: Chip, config: Config) -> (Rtc, Rc<RefCell<Chip>>) {
    let chip = Rc::new(RefCell::new(chip));
    let rtc = DS1302::new(
        SimPin::new(&chip, Wire::Ce),
        SimPin::new(&chip, Wire::Sclk),
        SimPin::new(&chip, Wire::Io),
        delay(),
        config,
    )
    .unwrap();
    chip.borrow_mut().commands.clear();
    chip.borrow_mut().transactions = 0;
    (rtc, chip)
}

pub fn chip_with_clock(clock: [u8; 9]) -> Chip {
    Chip {
        clock,
        ..Chip::default()
    }
}

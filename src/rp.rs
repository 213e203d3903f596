//! [`IoLine`] for RP2040 / RP235x GPIO pins.
//!
//! The pin is kept as SIO output with pull-down while the MCU drives it and
//! reconfigured into a pulled-up SIO input while the DS1302 answers.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};

#[cfg(feature = "rp2350")]
use rp235x_hal as hal;

#[cfg(feature = "rp2040")]
use rp2040_hal as hal;

use hal::gpio::{
    FunctionSio, FunctionSioInput, FunctionSioOutput, Pin, PinId, PullDown, PullUp, SioInput,
    SioOutput, ValidFunction,
};

use crate::IoLine;

/// The line was used in the wrong direction, or a reconfiguration was
/// interrupted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DirectionError;

impl embedded_hal::digital::Error for DirectionError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

enum Line<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    Output(Pin<I, FunctionSioOutput, PullDown>),
    Input(Pin<I, FunctionSioInput, PullUp>),
    Switching,
}

/// DS1302 I/O line on an RP GPIO pin.
pub struct RpIoLine<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    line: Line<I>,
}

impl<I> RpIoLine<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    pub fn new(pin: Pin<I, FunctionSioOutput, PullDown>) -> Self {
        RpIoLine {
            line: Line::Output(pin),
        }
    }

    /// Give the pin back as an output.
    pub fn free(self) -> Option<Pin<I, FunctionSioOutput, PullDown>> {
        match self.line {
            Line::Output(pin) => Some(pin),
            Line::Input(pin) => Some(pin.reconfigure()),
            Line::Switching => None,
        }
    }

    fn output(&mut self) -> Result<&mut Pin<I, FunctionSioOutput, PullDown>, DirectionError> {
        match &mut self.line {
            Line::Output(pin) => Ok(pin),
            _ => Err(DirectionError),
        }
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

impl<I> ErrorType for RpIoLine<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    type Error = DirectionError;
}

impl<I> OutputPin for RpIoLine<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let pin = self.output()?;
        infallible(pin.set_low());
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let pin = self.output()?;
        infallible(pin.set_high());
        Ok(())
    }
}

impl<I> InputPin for RpIoLine<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        match &mut self.line {
            Line::Input(pin) => Ok(infallible(pin.is_high())),
            _ => Err(DirectionError),
        }
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl<I> IoLine for RpIoLine<I>
where
    I: PinId + ValidFunction<FunctionSio<SioInput>> + ValidFunction<FunctionSio<SioOutput>>,
{
    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        self.line = match core::mem::replace(&mut self.line, Line::Switching) {
            Line::Input(pin) => Line::Output(pin.reconfigure()),
            Line::Output(pin) => Line::Output(pin),
            Line::Switching => return Err(DirectionError),
        };
        Ok(())
    }

    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        self.line = match core::mem::replace(&mut self.line, Line::Switching) {
            Line::Output(pin) => Line::Input(pin.into_pull_up_input()),
            Line::Input(pin) => Line::Input(pin),
            Line::Switching => return Err(DirectionError),
        };
        Ok(())
    }
}

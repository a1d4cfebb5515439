//! Hardware seams for the tank level monitor.
//!
//! Everything the pipeline touches outside of plain memory goes through one of
//! these traits: the ultrasonic transducer, the non-volatile settings medium
//! and the clock.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

use std::time::Duration;

/// Error type used at every trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A time-of-flight distance sensor (HC-SR04 style).
pub trait EchoSensor {
    /// Emit one trigger pulse and return the width of the echo pulse.
    ///
    /// Implementations must give up once `timeout` has elapsed without a
    /// complete echo and report that as an error.
    fn ping(&mut self, timeout: Duration) -> Result<Duration, BoxError>;
}

/// Byte-addressable non-volatile memory with an explicit commit step.
///
/// Writes land in a working copy; they only survive power loss once
/// [`NonVolatile::commit`] returns `Ok`.
pub trait NonVolatile {
    /// Number of addressable bytes.
    fn capacity(&self) -> usize;
    fn read_byte(&self, addr: usize) -> Result<u8, BoxError>;
    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), BoxError>;
    fn commit(&mut self) -> Result<(), BoxError>;
}

impl<T: EchoSensor + ?Sized> EchoSensor for Box<T> {
    fn ping(&mut self, timeout: Duration) -> Result<Duration, BoxError> {
        (**self).ping(timeout)
    }
}

impl<T: NonVolatile + ?Sized> NonVolatile for Box<T> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }
    fn read_byte(&self, addr: usize) -> Result<u8, BoxError> {
        (**self).read_byte(addr)
    }
    fn write_byte(&mut self, addr: usize, value: u8) -> Result<(), BoxError> {
        (**self).write_byte(addr, value)
    }
    fn commit(&mut self) -> Result<(), BoxError> {
        (**self).commit()
    }
}

// src/hal/traits.rs
//! Capability traits for the device bus and the trigger line

use async_trait::async_trait;

use crate::error::BusError;
use crate::hal::types::{Level, Pin};

/// Physical access to the converter: the chip-select, reset and data-ready
/// lines plus the serial transfer primitive. Any hardware or simulator
/// satisfying this contract can back the register driver.
#[async_trait]
pub trait BusAdapter: Send {
    /// Drive a control line to the given level.
    fn set_line(&mut self, pin: Pin, level: Level) -> Result<(), BusError>;

    /// Sample a control line.
    fn read_line(&mut self, pin: Pin) -> Result<Level, BusError>;

    /// Full-duplex transfer: clocks `out` onto the bus and returns the bytes
    /// read back. The response has the same length as `out`.
    async fn transfer(&mut self, out: &[u8]) -> Result<Vec<u8>, BusError>;

    /// Settle delay on the adapter's clock, so simulated time works too.
    async fn sleep_ms(&mut self, ms: u64);
}

/// Binary output driven for a fixed pulse width per trigger event. The
/// actuator touches only its own output line and runs concurrently with
/// Doppler sampling.
#[async_trait]
pub trait TriggerActuator: Send + Sync {
    /// Drive the trigger line high for `duration_ms`, then low.
    async fn pulse(&self, duration_ms: u64) -> Result<(), BusError>;
}

// src/error.rs
//! Error types shared across the acquisition core.
//!
//! Hardware-protocol errors are resolved as close to the bus as possible:
//! data-ready timeouts are logged and retried by the phase loops, and only
//! unrecoverable identity failures escalate to the session caller.

use thiserror::Error;

/// Errors raised by a bus adapter implementation.
#[derive(Debug, Error)]
pub enum BusError {
    /// The serial transfer primitive failed.
    #[error("serial transfer failed: {0}")]
    Transfer(String),

    /// A control line requested by the driver is not mapped on this adapter.
    #[error("control line {0:?} is not mapped on this adapter")]
    UnknownLine(crate::hal::types::Pin),
}

/// Errors raised by the converter register driver.
#[derive(Debug, Error)]
pub enum AdcError {
    /// The identity nibble read back after reset did not match the part id.
    /// Fatal to the configuration attempt; `configure` rechecks once before
    /// surfacing this.
    #[error("converter not responding: id nibble {found:#x}, expected {expected:#x}")]
    DeviceNotResponding {
        /// Part id the driver expects in the STATUS register's high nibble.
        expected: u8,
        /// Nibble actually read back.
        found: u8,
    },

    /// Data-ready never asserted within the polling bound. Recoverable: the
    /// calling phase loop retries the read.
    #[error("data-ready timeout after {polls} polls")]
    ReadTimeout {
        /// Number of polls attempted before giving up.
        polls: u32,
    },

    /// A converter configuration failed validation before touching the bus.
    #[error("invalid converter config: {0}")]
    InvalidConfig(&'static str),

    /// The driver was asked to do something its state machine forbids.
    #[error("invalid driver state: {0}")]
    InvalidState(&'static str),

    /// Underlying bus failure.
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl AdcError {
    /// Timeouts are an expected, tolerated condition during normal polling;
    /// everything else escalates.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AdcError::ReadTimeout { .. })
    }
}

/// Raised when the R-wave search window expires without a supra-threshold
/// sample. Handled inside the session loop by restarting the cycle from the
/// respiratory phase; never escapes `run_cycle`.
#[derive(Debug, Error)]
#[error("no R-wave detected within the search window")]
pub struct NoRWaveDetected;

/// Errors surfaced to the session caller.
#[derive(Debug, Error)]
pub enum VpwvError {
    /// Converter driver failure.
    #[error(transparent)]
    Adc(#[from] AdcError),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal processing failure (task join, malformed capture).
    #[error("processing error: {0}")]
    Processing(String),

    /// The persistence sink rejected a measurement.
    #[error("persistence sink rejected a measurement: {0}")]
    Sink(String),
}

/// Result type alias for session-level operations.
pub type VpwvResult<T> = Result<T, VpwvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_recoverable() {
        assert!(AdcError::ReadTimeout { polls: 400_000 }.is_recoverable());
        assert!(!AdcError::DeviceNotResponding { expected: 3, found: 0 }.is_recoverable());
    }

    #[test]
    fn error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VpwvError>();
        assert_send_sync::<AdcError>();
    }
}

//! vPWV-Core: venous pulse wave velocity acquisition and processing
//!
//! This library is the measurement heart of a vPWV instrument: it times a
//! mechanical pressure pulse to the cardiac and respiratory cycles, captures
//! the resulting Doppler signal and computes the propagation latency of the
//! pulse footprint. It features:
//!
//! - A bit-exact ADS1256 register driver over a pluggable bus adapter
//! - An adaptive acquisition state machine (expiration gate, R-wave gate,
//!   concurrent trigger and capture)
//! - A deterministic envelope / footprint pipeline for latency extraction
//! - A protocol-level simulator for hardware-free development and testing
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vpwv_core::acquisition::{AcquisitionSession, NullSink};
//! use vpwv_core::config::SystemConfig;
//! use vpwv_core::hal::simulator::SignalSimulator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let simulator = SignalSimulator::default();
//!     let (mut session, control) = AcquisitionSession::new(
//!         simulator.bus(),
//!         simulator.actuator(),
//!         SystemConfig::default(),
//!     );
//!
//!     // one-time ECG threshold calibration, then the measurement loop
//!     let calibration = session.calibrate().await?;
//!     println!("R-wave threshold: {:.3} V", calibration.threshold);
//!
//!     control.set_delay(0);
//!     let result = session.run_cycle().await?;
//!     println!("latency: {:.4} s", result.latency_s);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod acquisition;
pub mod adc;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;

// Re-export commonly used types for convenience
pub use acquisition::{
    AcquisitionSession, EcgCalibration, MeasurementSink, NullSink, Phase, SessionControl,
    SignalKind,
};
pub use adc::{Ads1256, ConverterConfig, DataRate, DriverState, Gain};
pub use config::SystemConfig;
pub use error::{AdcError, BusError, VpwvError, VpwvResult};
pub use hal::{BusAdapter, Level, Pin, TriggerActuator};
pub use processing::{doppler_latency, MeasurementResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

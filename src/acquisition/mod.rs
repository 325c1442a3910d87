// src/acquisition/mod.rs
//! Acquisition state machine and phase detectors

pub mod detectors;
pub mod session;

pub use detectors::*;
pub use session::*;

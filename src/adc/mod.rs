// src/adc/mod.rs
//! ADS1256 protocol: register map and the driver state machine

pub mod driver;
pub mod registers;

pub use driver::*;
pub use registers::*;

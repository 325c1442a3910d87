// src/hal/mod.rs
//! Hardware abstraction for the converter bus and the trigger line

pub mod simulator;
pub mod traits;
pub mod types;

pub use traits::*;
pub use types::*;

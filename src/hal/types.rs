// src/hal/types.rs
//! Line-level types for the bus abstraction

use serde::{Deserialize, Serialize};

/// Logic level on a control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// True for `Level::Low`. Data-ready is active low.
    pub fn is_low(self) -> bool {
        self == Level::Low
    }
}

/// Control line roles used by the converter driver. The adapter maps each
/// role to a physical pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pin {
    /// Converter reset, active low.
    Reset,
    /// Chip select, held low during framed transactions.
    ChipSelect,
    /// Data-ready, asserted low when a conversion is available.
    DataReady,
    /// Trigger output driving the inflation valve.
    Trigger,
}

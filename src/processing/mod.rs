// src/processing/mod.rs
//! Deterministic Doppler signal processing

pub mod envelope;
pub mod lowess;
pub mod peaks;
pub mod pipeline;

pub use pipeline::{doppler_latency, MeasurementResult};

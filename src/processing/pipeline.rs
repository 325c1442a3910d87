// src/processing/pipeline.rs
//! Doppler latency pipeline: envelope extraction, smoothing, normalization
//! and footprint detection.
//!
//! The pipeline is a pure function of the capture and its sampling rate. No
//! hidden state, no randomness: the same buffer always yields the same
//! latency, bit for bit.

use tracing::debug;

use crate::config::constants::pipeline as params;

use super::{envelope, lowess, peaks};

/// Everything a completed measurement cycle hands back to the caller.
#[derive(Debug, Clone)]
pub struct MeasurementResult {
    /// Seconds between capture start and the detected footprint.
    pub latency_s: f64,
    /// Normalized velocitogram envelope, values in [0, 1].
    pub envelope: Vec<f64>,
    /// Respiratory buffer collected while gating the cycle.
    pub breath: Vec<f64>,
    /// ECG buffer collected while gating the cycle.
    pub ecg: Vec<f64>,
    /// Raw Doppler capture, exactly one second of samples.
    pub doppler: Vec<f64>,
}

/// Latency and normalized envelope for one Doppler capture.
///
/// `x` must hold one second of samples at `sample_rate_hz`; anything shorter
/// than twice the blanking interval cannot be analyzed. The returned latency
/// lies in [0, 1) seconds by construction of the capture window.
pub fn doppler_latency(x: &[f64], sample_rate_hz: u32) -> (f64, Vec<f64>) {
    let fs = sample_rate_hz as f64;
    let blanking = (params::BLANKING_FRACTION * fs) as usize;
    let min_peak_width = (params::MIN_PEAK_WIDTH_FRACTION * fs).floor();
    assert!(
        x.len() > 2 * blanking,
        "capture shorter than the analysis window"
    );

    // envelope of the derivative; duplicate the final RMS value twice to
    // make up for the sample lost to differentiation
    let dx = envelope::diff(x);
    let rms_window = (sample_rate_hz / params::RMS_WINDOW_DIVISOR) as usize;
    let mut v = envelope::window_rms(&dx, rms_window);
    if let Some(&last) = v.last() {
        v.push(last);
        v.push(last);
    }

    let mut v = lowess::smooth(&v, params::LOWESS_SPAN);

    let min = v.iter().cloned().fold(f64::INFINITY, f64::min);
    for s in v.iter_mut() {
        *s -= min;
    }
    let max = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 {
        for s in v.iter_mut() {
            *s /= max;
        }
    }

    // first sufficiently wide peak after the blanking interval; a capture
    // with no qualifying peak falls back to the global maximum of the
    // searched region
    let searched = &v[blanking..];
    let peak = blanking
        + peaks::first_peak_with_min_width(searched, min_peak_width)
            .or_else(|| peaks::argmax(searched))
            .unwrap_or(0);

    let valley_from = blanking / 2;
    let valley = valley_from + peaks::argmin(&v[valley_from..peak]).unwrap_or(0);

    // footprint: the point closest to 5% of the peak-to-valley amplitude
    let level = v[valley] + params::FOOT_THRESHOLD_PERCENT / 100.0 * (v[peak] - v[valley]);
    let deltas: Vec<f64> = v[valley..peak].iter().map(|s| (s - level).abs()).collect();
    let crossing = valley + peaks::argmin(&deltas).unwrap_or(0);

    let latency_s = crossing as f64 / fs;
    debug!(latency_s, peak, valley, crossing, "footprint located");
    (latency_s, v)
}

// src/acquisition/detectors.rs
//! Threshold calibration and phase detectors for the respiratory and ECG
//! channels.

use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::processing::peaks;

/// ECG threshold produced once per session, together with the monitoring
/// buffer it was derived from. Handed to the caller at session start.
#[derive(Debug, Clone)]
pub struct EcgCalibration {
    /// R-wave detection threshold in volts.
    pub threshold: f64,
    /// The calibration buffer (10 s of ECG at 500 Hz).
    pub buffer: Vec<f64>,
}

/// Calibrate the R-wave threshold from an ECG monitoring buffer.
///
/// The threshold starts at mean + a fraction of the peak-to-peak amplitude
/// and is raised in fixed increments while the window still holds more
/// supra-threshold peaks than a relaxed patient should produce (such a
/// threshold is probably intercepting T-waves). The refinement loop is
/// capped; past the cap the threshold falls back to mean + half the
/// amplitude.
pub fn calibrate_ecg_threshold(buffer: &[f64], config: &DetectionConfig) -> f64 {
    let mean = mean(buffer);
    let (min, max) = min_max(buffer);
    let amplitude = max - min;

    let mut threshold = mean + config.ecg_threshold_fraction * amplitude;
    let mut iterations = 0usize;
    while peaks::count_peaks_above(buffer, threshold) > config.ecg_max_peaks {
        if iterations >= config.ecg_refine_cap {
            threshold = mean + config.ecg_fallback_fraction * amplitude;
            warn!(threshold, "refinement cap reached, using fallback threshold");
            break;
        }
        threshold += config.ecg_refine_step * amplitude;
        iterations += 1;
    }
    debug!(threshold, iterations, "ECG threshold calibrated");
    threshold
}

/// Expiration detector: adaptive threshold over the trailing seed window
/// plus a hysteresis rule on the crossing.
///
/// Expiration is declared when, of the last `2×N` samples, the first N all
/// sit at or above the threshold and the following N all at or below it. A
/// single-sample dip amid otherwise-high samples never fires.
#[derive(Debug)]
pub struct ExpirationDetector {
    threshold: f64,
    hysteresis: usize,
    refresh_interval: usize,
    window: usize,
}

impl ExpirationDetector {
    /// Seed the threshold from the initial respiratory window (its mean).
    pub fn new(seed: &[f64], sample_rate_hz: u32, config: &DetectionConfig) -> Self {
        Self {
            threshold: mean(seed),
            hysteresis: config.hysteresis_samples,
            refresh_interval: (sample_rate_hz * config.breath_refresh_secs).max(1) as usize,
            window: (sample_rate_hz * config.breath_seed_secs) as usize,
        }
    }

    /// Current adaptive threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Examine `buffer` after a sample was appended; true once expiration is
    /// detected at the buffer's tail.
    ///
    /// Every refresh interval the threshold is recomputed from the trailing
    /// window, tracking baseline wander.
    pub fn update(&mut self, buffer: &[f64]) -> bool {
        if buffer.len() % self.refresh_interval == 0 {
            let tail = &buffer[buffer.len().saturating_sub(self.window)..];
            self.threshold = mean(tail);
        }

        let n = self.hysteresis;
        if buffer.len() < 2 * n {
            return false;
        }
        let pre = &buffer[buffer.len() - 2 * n..buffer.len() - n];
        let post = &buffer[buffer.len() - n..];
        pre.iter().all(|&s| s >= self.threshold) && post.iter().all(|&s| s <= self.threshold)
    }
}

fn mean(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    x.iter().sum::<f64>() / x.len() as f64
}

fn min_max(x: &[f64]) -> (f64, f64) {
    x.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spiky_ecg(beats: usize, len: usize) -> Vec<f64> {
        let mut x = vec![0.0; len];
        let stride = len / beats;
        for b in 0..beats {
            x[b * stride + stride / 2] = 1.0;
        }
        x
    }

    #[test]
    fn threshold_sits_between_mean_and_max() {
        let buffer = spiky_ecg(10, 5000);
        let config = DetectionConfig::default();
        let threshold = calibrate_ecg_threshold(&buffer, &config);
        let mean = buffer.iter().sum::<f64>() / buffer.len() as f64;
        assert!(threshold > mean);
        assert!(threshold < 1.0);
        // 10 peaks stay under the refinement bound: the initial threshold is kept
        assert!((threshold - (mean + 0.15 * 1.0)).abs() < 1e-12);
    }

    #[test]
    fn refinement_raises_a_low_threshold() {
        // 10 R-waves at full scale plus 20 T-wave-sized bumps: the initial
        // threshold intercepts all 30, the refined one only the R-waves
        let mut buffer = spiky_ecg(10, 3000);
        for b in 0..20 {
            buffer[b * 150 + 40] = 0.3;
        }
        let config = DetectionConfig::default();
        let threshold = calibrate_ecg_threshold(&buffer, &config);
        let mean = buffer.iter().sum::<f64>() / buffer.len() as f64;
        assert!(threshold > mean + 0.15);
        assert!(peaks::count_peaks_above(&buffer, threshold) <= config.ecg_max_peaks);
    }

    #[test]
    fn refinement_cap_falls_back() {
        // 20 peaks all at full scale: raising the threshold never thins them
        // out before the cap, so the fallback threshold applies
        let buffer = spiky_ecg(20, 2000);
        let config = DetectionConfig::default();
        let threshold = calibrate_ecg_threshold(&buffer, &config);
        let mean = buffer.iter().sum::<f64>() / buffer.len() as f64;
        assert!((threshold - (mean + 0.5 * 1.0)).abs() < 1e-12);
    }

    fn detector(threshold: f64) -> ExpirationDetector {
        ExpirationDetector {
            threshold,
            hysteresis: 5,
            refresh_interval: 50,
            window: 250,
        }
    }

    #[test]
    fn fires_exactly_at_the_crossing_boundary() {
        let mut det = detector(1.0);
        let mut buffer = Vec::new();
        for i in 0..10 {
            buffer.push(if i < 5 { 1.2 } else { 0.8 });
            let fired = det.update(&buffer);
            assert_eq!(fired, i == 9, "sample {i}");
        }
    }

    #[test]
    fn a_single_dip_does_not_fire() {
        let mut det = detector(1.0);
        let mut buffer = vec![1.2; 5];
        buffer.extend([0.8, 1.2, 1.2, 1.2, 1.2]);
        assert!(!det.update(&buffer));
    }

    #[test]
    fn threshold_refreshes_from_the_trailing_window() {
        let mut det = detector(0.0);
        // 50 samples drifted up to 2.0: refresh lands exactly on the interval
        let buffer = vec![2.0; 50];
        det.update(&buffer);
        assert!((det.threshold() - 2.0).abs() < 1e-12);
    }
}

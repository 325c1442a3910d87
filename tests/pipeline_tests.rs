// tests/pipeline_tests.rs
//! End-to-end latency pipeline scenarios at the real capture geometry, plus
//! property checks over arbitrary buffers.

use proptest::prelude::*;

use vpwv_core::processing::{doppler_latency, peaks};

const CAPTURE_RATE_HZ: u32 = 15_000;

/// One second of quiet baseline with a modulated burst whose 5% footprint
/// sits at `onset` seconds.
fn capture_with_burst(onset: f64) -> Vec<f64> {
    let fs = CAPTURE_RATE_HZ as f64;
    let center = onset + 0.01;
    (0..CAPTURE_RATE_HZ as usize)
        .map(|i| {
            let t = i as f64 / fs;
            let env = (-(t - center) * (t - center) / (2.0 * 0.01 * 0.01)).exp();
            2.0 * env * (std::f64::consts::TAU * 800.0 * t).sin()
        })
        .collect()
}

#[test]
fn burst_at_sample_3000_yields_a_latency_near_200ms() {
    let x = capture_with_burst(0.2);
    let (latency, v) = doppler_latency(&x, CAPTURE_RATE_HZ);

    assert_eq!(v.len(), x.len() + 1);
    assert!((0.0..1.0).contains(&latency));
    // smoothing widens the footprint, pulling the crossing slightly earlier
    assert!((latency - 0.2).abs() < 0.1, "latency {latency}");

    // the envelope maximum sits within one blanking window of the burst
    let peak = peaks::argmax(&v).unwrap();
    assert!((peak as i64 - 3_000).unsigned_abs() <= 1_500, "peak {peak}");

    // the footprint precedes the peak
    let crossing = (latency * CAPTURE_RATE_HZ as f64).round() as usize;
    assert!(crossing <= peak);
}

#[test]
fn later_bursts_yield_later_footprints() {
    let (early, _) = doppler_latency(&capture_with_burst(0.25), CAPTURE_RATE_HZ);
    let (late, _) = doppler_latency(&capture_with_burst(0.6), CAPTURE_RATE_HZ);
    assert!(late > early, "{late} vs {early}");
}

#[test]
fn pipeline_is_bit_for_bit_deterministic() {
    let x = capture_with_burst(0.35);
    let first = doppler_latency(&x, CAPTURE_RATE_HZ);
    let second = doppler_latency(&x, CAPTURE_RATE_HZ);
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
}

#[test]
fn monotone_capture_without_a_peak_still_yields_a_bounded_latency() {
    // strictly growing derivative: the envelope rises to the right edge and
    // no interior peak exists
    let n = CAPTURE_RATE_HZ as usize;
    let x: Vec<f64> = (0..n).map(|i| (i as f64 / n as f64).powi(3)).collect();
    let (latency, v) = doppler_latency(&x, CAPTURE_RATE_HZ);
    assert!((0.0..1.0).contains(&latency));
    assert!(v.iter().all(|&s| (0.0..=1.0).contains(&s)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn latency_stays_in_the_unit_interval(
        raw in proptest::collection::vec(-5.0f64..5.0, 2_000)
    ) {
        let (latency, v) = doppler_latency(&raw, 2_000);
        prop_assert!((0.0..1.0).contains(&latency));
        prop_assert!(v.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn scaling_the_capture_does_not_move_the_footprint(
        scale in 0.5f64..4.0
    ) {
        let x = capture_with_burst(0.3);
        let scaled: Vec<f64> = x.iter().map(|&s| s * scale).collect();
        let (reference, _) = doppler_latency(&x, CAPTURE_RATE_HZ);
        let (rescaled, _) = doppler_latency(&scaled, CAPTURE_RATE_HZ);
        // rounding in the scaled envelope can move the crossing by a sample
        prop_assert!((reference - rescaled).abs() < 5e-3);
    }
}

// benches/pipeline.rs
//! Latency pipeline benchmarks at the real capture geometry.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vpwv_core::processing::{doppler_latency, envelope, lowess};

fn synthetic_capture(n: usize, fs: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / fs;
            let env = (-(t - 0.25) * (t - 0.25) / (2.0 * 0.02 * 0.02)).exp();
            2.0 * env * (std::f64::consts::TAU * 800.0 * t).sin()
        })
        .collect()
}

fn bench_full_pipeline(c: &mut Criterion) {
    let capture = synthetic_capture(15_000, 15_000.0);
    c.bench_function("doppler_latency/15000", |b| {
        b.iter(|| doppler_latency(black_box(&capture), 15_000))
    });
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_stages");
    for &n in &[2_000usize, 15_000] {
        let capture = synthetic_capture(n, n as f64);
        let dx = envelope::diff(&capture);
        let rms = envelope::window_rms(&dx, n / 100);

        group.bench_with_input(BenchmarkId::new("window_rms", n), &dx, |b, dx| {
            b.iter(|| envelope::window_rms(black_box(dx), n / 100))
        });
        group.bench_with_input(BenchmarkId::new("lowess", n), &rms, |b, rms| {
            b.iter(|| lowess::smooth(black_box(rms), 0.1))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_pipeline, bench_stages);
criterion_main!(benches);

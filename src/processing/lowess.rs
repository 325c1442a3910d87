// src/processing/lowess.rs
//! Locally weighted linear regression over an evenly spaced index axis.
//!
//! Standalone deterministic routine: tricube neighbourhood weights, one
//! weighted linear fit per point, zero robustifying iterations. The
//! smoothing span is a fixed fraction of the series length so repeated runs
//! on the same buffer are bit-for-bit reproducible.

/// Smooth `y` against its sample index with local linear fits.
///
/// `frac` is the fraction of the series length used as the neighbourhood,
/// clamped to at least two points. Series shorter than three samples are
/// returned unchanged.
pub fn smooth(y: &[f64], frac: f64) -> Vec<f64> {
    let n = y.len();
    if n < 3 {
        return y.to_vec();
    }
    let k = ((frac * n as f64).floor() as usize).clamp(2, n);

    let mut out = Vec::with_capacity(n);
    let mut left = 0usize;
    for i in 0..n {
        // slide the k-nearest-neighbour window along the index axis
        while left + k < n && i - left > left + k - i {
            left += 1;
        }
        let right = left + k - 1;
        let d_max = (i - left).max(right - i) as f64;

        let mut sw = 0.0;
        let mut swx = 0.0;
        let mut swy = 0.0;
        let mut swxx = 0.0;
        let mut swxy = 0.0;
        for j in left..=right {
            let d = (j as f64 - i as f64).abs();
            let w = tricube(if d_max > 0.0 { d / d_max } else { 0.0 });
            let x = j as f64;
            sw += w;
            swx += w * x;
            swy += w * y[j];
            swxx += w * x * x;
            swxy += w * x * y[j];
        }

        let denom = sw * swxx - swx * swx;
        let fitted = if denom.abs() > f64::EPSILON * sw * swxx.max(1.0) {
            let slope = (sw * swxy - swx * swy) / denom;
            let intercept = (swy - slope * swx) / sw;
            intercept + slope * i as f64
        } else {
            swy / sw
        };
        out.push(fitted);
    }
    out
}

fn tricube(u: f64) -> f64 {
    if u >= 1.0 {
        return 0.0;
    }
    let t = 1.0 - u * u * u;
    t * t * t
}

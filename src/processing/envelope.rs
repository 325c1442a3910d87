// src/processing/envelope.rs
//! Envelope primitives: first difference, centered windowed RMS and the
//! windowed outlier flagging used for raw-signal quality checks.

/// First discrete difference, length `x.len() - 1`.
pub fn diff(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Centered moving-window RMS.
///
/// Each output sample is the RMS of `x` over a `window`-sample boxcar
/// centered on it, computed as a same-length convolution of the squared
/// signal; the edges see a truncated window.
pub fn window_rms(x: &[f64], window: usize) -> Vec<f64> {
    let n = x.len();
    let w = window.max(1);
    let squared: Vec<f64> = x.iter().map(|v| v * v).collect();

    // "same" slice of the full convolution with a w-long boxcar of 1/w
    let offset = (w - 1) / 2;
    let mut out = Vec::with_capacity(n);
    for t in offset..offset + n {
        let lo = (t + 1).saturating_sub(w);
        let hi = t.min(n.saturating_sub(1));
        let sum: f64 = squared[lo..=hi].iter().sum();
        out.push((sum / w as f64).sqrt());
    }
    out
}

/// Flags samples deviating more than `sigma` standard deviations from the
/// mean of their own non-overlapping window of `window` samples.
pub fn is_outlier(x: &[f64], window: usize, sigma: f64) -> Vec<bool> {
    let w = window.max(1);
    let mut flags = Vec::with_capacity(x.len());
    for chunk in x.chunks(w) {
        let mean = chunk.iter().sum::<f64>() / chunk.len() as f64;
        let variance =
            chunk.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / chunk.len() as f64;
        let bound = sigma * variance.sqrt();
        flags.extend(chunk.iter().map(|&v| v >= mean + bound || v <= mean - bound));
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_drops_one_sample() {
        assert_eq!(diff(&[1.0, 3.0, 2.0]), vec![2.0, -1.0]);
        assert!(diff(&[4.0]).is_empty());
    }

    #[test]
    fn rms_of_constant_signal_is_the_constant() {
        let x = vec![2.0; 100];
        let rms = window_rms(&x, 10);
        assert_eq!(rms.len(), x.len());
        // away from the edges the truncated window has no effect
        for &v in &rms[10..90] {
            assert!((v - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rms_edges_see_truncated_windows() {
        let x = vec![1.0; 20];
        let rms = window_rms(&x, 4);
        assert!(rms[0] < 1.0);
        assert!((rms[10] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn outlier_flags_a_spike() {
        let mut x = vec![0.0; 40];
        x[7] = 10.0;
        x[20] = 1e-3;
        let flags = is_outlier(&x, 20, 3.0);
        assert_eq!(flags.len(), x.len());
        assert!(flags[7]);
        assert!(!flags[3]);
        assert!(!flags[25]);
    }
}

// src/processing/peaks.rs
//! Local maxima with prominence-based width estimation, plus the argmin /
//! argmax helpers the pipeline builds on. Ties always resolve to the lowest
//! index.

/// Indices of local maxima. Flat-topped peaks report their midpoint.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let n = x.len();
    if n < 3 {
        return peaks;
    }
    let last = n - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Topographic prominence of the peak at `peak`, with the positions of the
/// bases bounding it on each side.
fn prominence(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let height = x[peak];

    let mut left_min = height;
    let mut left_base = peak;
    let mut i = peak;
    while i > 0 && x[i - 1] <= height {
        i -= 1;
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_min = height;
    let mut right_base = peak;
    let mut j = peak;
    while j + 1 < x.len() && x[j + 1] <= height {
        j += 1;
        if x[j] < right_min {
            right_min = x[j];
            right_base = j;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

/// Peak width in samples, measured at half the peak's prominence with linear
/// interpolation at the flanks.
fn width_at_half_prominence(x: &[f64], peak: usize, left_base: usize, right_base: usize, prom: f64) -> f64 {
    let level = x[peak] - 0.5 * prom;

    let mut i = peak;
    while i > left_base && x[i] > level {
        i -= 1;
    }
    let mut left = i as f64;
    if x[i] < level {
        left += (level - x[i]) / (x[i + 1] - x[i]);
    }

    let mut j = peak;
    while j < right_base && x[j] > level {
        j += 1;
    }
    let mut right = j as f64;
    if x[j] < level {
        right -= (level - x[j]) / (x[j - 1] - x[j]);
    }

    right - left
}

/// First local maximum whose width at half prominence is at least
/// `min_width` samples, or `None` when no peak qualifies.
pub fn first_peak_with_min_width(x: &[f64], min_width: f64) -> Option<usize> {
    local_maxima(x).into_iter().find(|&p| {
        let (prom, left_base, right_base) = prominence(x, p);
        width_at_half_prominence(x, p, left_base, right_base, prom) >= min_width
    })
}

/// Number of local maxima with height at or above `threshold`.
pub fn count_peaks_above(x: &[f64], threshold: f64) -> usize {
    local_maxima(x)
        .into_iter()
        .filter(|&p| x[p] >= threshold)
        .count()
}

/// Index of the largest value; first index on ties.
pub fn argmax(x: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in x.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the smallest value; first index on ties.
pub fn argmin(x: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in x.iter().enumerate() {
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

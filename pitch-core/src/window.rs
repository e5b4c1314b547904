//! # Windowing
//!
//! Slices the front of a frame into half-overlapping analysis windows and
//! tapers each one with a Hamming window before it reaches the transform.

use std::f64::consts::PI;

/// Computes a Hamming taper of the given length.
///
/// `taper[i] = 0.54 - 0.46 * cos(2πi / (length - 1))`. A single-sample taper
/// is `[1.0]`, since the formula is undefined there.
pub fn hamming(length: usize) -> Vec<f64> {
    if length <= 1 {
        return vec![1.0; length];
    }
    let n_minus_1 = (length - 1) as f64;
    (0..length)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n_minus_1).cos())
        .collect()
}

/// Produces `count` tapered windows of `taper.len()` samples, each starting
/// half a window after the previous one.
///
/// The caller guarantees `signal` is long enough:
/// `(count - 1) * len / 2 + len <= signal.len()`.
pub fn overlapping_windows<'a>(
    signal: &'a [f64],
    taper: &'a [f64],
    count: usize,
) -> impl Iterator<Item = Vec<f64>> + 'a {
    let length = taper.len();
    let hop = length / 2;
    (0..count).map(move |w| {
        let start = w * hop;
        signal[start..start + length]
            .iter()
            .zip(taper)
            .map(|(sample, weight)| sample * weight)
            .collect()
    })
}

//! # Fast Fourier Transform (FFT) Module
//!
//! A recursive radix-2 Cooley-Tukey transform for the short analysis windows
//! the estimator works on. Only the non-redundant half of the spectrum of a
//! real signal is kept.
//!
//! ## Features
//! - Divide-and-conquer even/odd split with `e^{-2πik/N}` twiddles
//! - Real-input wrapper returning bins `0..=N/2`
//! - Magnitude extraction for power aggregation

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use crate::error::EstimateError;

/// Computes the discrete Fourier transform of `input`.
///
/// The length must be a power of two; callers validate this beforehand
/// (see [`rfft`]). A length-1 input is returned unchanged.
pub fn fft(input: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }

    let even: Vec<_> = input.iter().step_by(2).copied().collect();
    let odd: Vec<_> = input.iter().skip(1).step_by(2).copied().collect();
    let fft_even = fft(&even);
    let fft_odd = fft(&odd);

    let half = n / 2;
    let mut output = vec![Complex::new(0.0, 0.0); n];
    for k in 0..half {
        let twiddle = Complex::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
        let t = twiddle * fft_odd[k];
        output[k] = fft_even[k] + t;
        output[k + half] = fft_even[k] - t;
    }
    output
}

/// Transforms a real-valued signal and keeps the first `N/2 + 1` bins.
///
/// # Errors
/// * `InvalidWindowLength` if the length is zero or not a power of two
pub fn rfft(signal: &[f64]) -> Result<Vec<Complex<f64>>, EstimateError> {
    let n = signal.len();
    if !n.is_power_of_two() {
        return Err(EstimateError::InvalidWindowLength(n));
    }

    let input: Vec<Complex<f64>> = signal
        .iter()
        .map(|&sample| Complex::new(sample, 0.0))
        .collect();

    let mut spectrum = fft(&input);
    spectrum.truncate(n / 2 + 1);
    Ok(spectrum)
}

/// Calculates the magnitude of every bin of a complex spectrum.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f64>]) -> Vec<f64> {
    spectrum.iter().map(|c| c.norm()).collect()
}

/// Magnitude spectrum of a real signal, `N/2 + 1` bins long.
pub fn magnitude_spectrum(signal: &[f64]) -> Result<Vec<f64>, EstimateError> {
    rfft(signal).map(|spectrum| spectrum_to_magnitudes(&spectrum))
}

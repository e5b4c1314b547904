//! # Power Spectrum Module
//!
//! Accumulates the magnitude spectra of all analysis windows into one power
//! spectrum and picks the strongest distinct peaks from it, gated by a noise
//! floor derived from the spectrum's mean.

use crate::error::EstimateError;
use crate::fft::magnitude_spectrum;

/// Sums the magnitude spectra of every window bin by bin.
///
/// No normalization is applied; the result is only ever compared against
/// itself within one call.
pub fn aggregate_power<I>(windows: I, spectrum_len: usize) -> Result<Vec<f64>, EstimateError>
where
    I: IntoIterator<Item = Vec<f64>>,
{
    let mut powers = vec![0.0; spectrum_len];
    for window in windows {
        let magnitudes = magnitude_spectrum(&window)?;
        for (power, magnitude) in powers.iter_mut().zip(magnitudes) {
            *power += magnitude;
        }
    }
    Ok(powers)
}

/// Arithmetic mean of the spectrum from `start_bin` upward.
pub fn mean_power(powers: &[f64], start_bin: usize) -> f64 {
    let analyzed = powers.get(start_bin..).unwrap_or(&[]);
    if analyzed.is_empty() {
        return 0.0;
    }
    analyzed.iter().sum::<f64>() / analyzed.len() as f64
}

/// Outcome of the peak search.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakSearch {
    /// Distinct bin indices in the order they were found.
    pub peaks: Vec<usize>,
    /// Power a peak had to exceed to count as signal.
    pub threshold: f64,
    /// Whether any running maximum crossed the threshold.
    pub signal_found: bool,
}

impl PeakSearch {
    /// Power of the strongest (first found) peak.
    pub fn strongest(&self, powers: &[f64]) -> f64 {
        self.peaks.first().map_or(0.0, |&bin| powers[bin])
    }
}

/// Finds up to `peak_count` distinct peaks by repeated exhaustive scans.
///
/// Each scan walks every bin from `start_bin` upward, skipping bins already
/// chosen, and keeps the first bin with the greatest power, so ties go to
/// the lowest index. The noise gate is checked against every new running
/// maximum as the scan proceeds.
pub fn find_peaks(
    powers: &[f64],
    start_bin: usize,
    peak_count: usize,
    noise_multiplier: f64,
) -> PeakSearch {
    let threshold = mean_power(powers, start_bin) * noise_multiplier;
    let mut excluded = vec![false; powers.len()];
    let mut peaks = Vec::with_capacity(peak_count);
    let mut signal_found = false;

    for _ in 0..peak_count {
        let mut best: Option<(usize, f64)> = None;
        for (bin, &power) in powers.iter().enumerate().skip(start_bin) {
            if excluded[bin] {
                continue;
            }
            if best.is_none_or(|(_, max)| power > max) {
                best = Some((bin, power));
                if power > threshold {
                    signal_found = true;
                }
            }
        }

        match best {
            Some((bin, _)) => {
                excluded[bin] = true;
                peaks.push(bin);
            }
            None => break,
        }
    }

    PeakSearch {
        peaks,
        threshold,
        signal_found,
    }
}

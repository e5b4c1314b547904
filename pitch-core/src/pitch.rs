//! # Pitch Detection Module
//!
//! This module runs the single-frame frequency estimator. One call takes a
//! frame of samples through every stage of the pipeline and returns either a
//! frequency in Hz or the reason no frequency could be given.
//!
//! ## Pipeline
//! - Hamming-tapered, half-overlapping windows from the front of the frame
//! - Recursive FFT magnitude spectra summed into one power spectrum
//! - Exhaustive search for the strongest distinct peaks, gated by a noise floor
//! - Harmonic scoring to prefer the fundamental over louder overtones
//! - Parabolic interpolation on log-power for sub-bin accuracy

use tracing::debug;

use crate::config::EstimatorConfig;
use crate::error::EstimateError;
use crate::harmonic::select_fundamental;
use crate::spectrum::{aggregate_power, find_peaks};
use crate::window::{hamming, overlapping_windows};
use crate::Estimate;

/// Vertex of the parabola fitted through three neighbouring points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParabolicPeak {
    /// Fractional index of the vertex.
    pub index: f64,
    /// Interpolated value at the vertex.
    pub value: f64,
}

/// Natural log of every power value, floored so silent bins stay finite.
pub fn log_spectrum(powers: &[f64], floor: f64) -> Vec<f64> {
    powers.iter().map(|&p| p.max(floor).ln()).collect()
}

/// Fits a parabola through `y[i-1]`, `y[i]`, `y[i+1]` and returns its vertex.
///
/// The centre index is clamped to `[1, len - 2]` so the neighborhood stays in
/// range. When the three points are collinear, or any of them is infinite, the
/// unrefined centre index and value are returned instead of non-finite ones.
///
/// # Arguments
/// * `y` - Values to interpolate (log-power spectrum); needs at least 3 entries
/// * `i` - Index of the local maximum
///
/// # Returns
/// * `Some(ParabolicPeak)` - Refined index and value
/// * `None` - Fewer than three values to fit
pub fn parabolic(y: &[f64], i: usize) -> Option<ParabolicPeak> {
    if y.len() < 3 {
        return None;
    }
    let idx = i.clamp(1, y.len() - 2);

    let alpha = y[idx - 1];
    let beta = y[idx];
    let gamma = y[idx + 1];

    let denominator = alpha - 2.0 * beta + gamma;
    let p = 0.5 * (alpha - gamma) / denominator;
    let value = beta - 0.25 * (alpha - gamma) * p;
    if denominator == 0.0 || !p.is_finite() || !value.is_finite() {
        return Some(ParabolicPeak {
            index: idx as f64,
            value: beta,
        });
    }

    Some(ParabolicPeak {
        index: idx as f64 + p,
        value,
    })
}

/// Converts a fractional bin of a `window_length`-point spectrum to Hz.
///
/// A refined bin can land left of zero when the peak sits on a steep, nearly
/// linear slope at the bottom of the spectrum; that is reported as
/// [`EstimateError::NegativeFrequency`] rather than as a frequency.
pub fn bin_to_frequency(
    sample_rate: u32,
    bin: f64,
    window_length: usize,
) -> Result<f64, EstimateError> {
    let frequency = sample_rate as f64 * bin / window_length as f64;
    if frequency < 0.0 {
        return Err(EstimateError::NegativeFrequency(frequency));
    }
    Ok(frequency)
}

/// Estimates the fundamental frequency of fixed-size audio frames.
///
/// The estimator holds nothing but its configuration, so calls never affect
/// each other and one instance can be shared between threads.
#[derive(Debug, Clone)]
pub struct FrequencyEstimator {
    config: EstimatorConfig,
}

impl FrequencyEstimator {
    /// Creates an estimator with the default algorithm constants.
    ///
    /// No validation is done: `buffer_size` should be four times a power of
    /// two, otherwise every call fails with `InvalidWindowLength`.
    pub fn new(sample_rate: u32, buffer_size: usize) -> Self {
        Self::with_config(EstimatorConfig::new(sample_rate, buffer_size))
    }

    pub fn with_config(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimates the fundamental frequency of one frame.
    ///
    /// Only the first `buffer_size` samples are used; anything after them is
    /// ignored.
    ///
    /// # Arguments
    /// * `samples` - Mono samples, at least `buffer_size` of them
    ///
    /// # Returns
    /// * `Ok(Estimate)` - Frequency in Hz with the bins it was derived from
    /// * `Err(EstimateError)` - Too few samples, unusable window length,
    ///   signal under the noise floor, or a negative refined frequency
    pub fn estimate(&self, samples: &[f64]) -> Result<Estimate, EstimateError> {
        let expected = self.config.buffer_size;
        if samples.len() < expected {
            debug!(expected, actual = samples.len(), "not enough samples");
            return Err(EstimateError::InsufficientSamples {
                expected,
                actual: samples.len(),
            });
        }

        let window_length = self.config.analysis_window_length()?;
        let params = &self.config.params;
        let frame = &samples[..expected];

        let taper = hamming(window_length);
        let windows = overlapping_windows(frame, &taper, self.config.window_count());
        let powers = aggregate_power(windows, self.config.spectrum_len())?;

        let search = find_peaks(
            &powers,
            params.start_bin,
            params.peak_count,
            params.noise_multiplier,
        );
        tracing::trace!(peaks = ?search.peaks, threshold = search.threshold, "peak search");

        let quiet = || EstimateError::SignalTooQuiet {
            peak_power: search.strongest(&powers),
            threshold: search.threshold,
        };
        if !search.signal_found {
            debug!(threshold = search.threshold, "no peak above noise floor");
            return Err(quiet());
        }
        let peak_bin = select_fundamental(&powers, &search.peaks, &params.harmonic_multipliers)
            .ok_or_else(quiet)?;

        let log_powers = log_spectrum(&powers, params.log_floor);
        let vertex = parabolic(&log_powers, peak_bin)
            .ok_or(EstimateError::InvalidWindowLength(window_length))?;

        let frequency = bin_to_frequency(self.config.sample_rate, vertex.index, window_length)?;

        debug!(peak_bin, refined_bin = vertex.index, frequency, "estimated frequency");
        Ok(Estimate {
            frequency,
            peak_bin,
            refined_bin: vertex.index,
            peak_log_power: vertex.value,
        })
    }

    /// Same as [`FrequencyEstimator::estimate`], collapsed onto the numeric
    /// channel the platform bridges use: a frequency in Hz, or
    /// [`crate::INSUFFICIENT_SAMPLES`] / [`crate::SIGNAL_TOO_QUIET`].
    pub fn find_frequency(&self, samples: &[f64]) -> f64 {
        match self.estimate(samples) {
            Ok(estimate) => estimate.frequency,
            Err(e) => e.sentinel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parabola_vertex_is_recovered() {
        // y = -(x - 5.3)^2 sampled at 4, 5, 6.
        let y: Vec<f64> = (0..10).map(|x| -((x as f64 - 5.3).powi(2))).collect();
        let peak = parabolic(&y, 5).unwrap();
        assert!((peak.index - 5.3).abs() < 1e-12);
        assert!(peak.value.abs() < 1e-12);
    }

    #[test]
    fn flat_neighborhood_falls_back_to_integer_bin() {
        let y = [0.0, 2.0, 2.0, 2.0, 0.0];
        let peak = parabolic(&y, 2).unwrap();
        assert_eq!(peak.index, 2.0);
        assert_eq!(peak.value, 2.0);
    }

    #[test]
    fn index_is_clamped_into_range() {
        let y = [1.0, 3.0, 1.0];
        assert_eq!(parabolic(&y, 0).unwrap().index, 1.0);
        assert_eq!(parabolic(&y, 2).unwrap().index, 1.0);
        assert!(parabolic(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn log_spectrum_floors_zeros() {
        let logs = log_spectrum(&[0.0, 1.0, std::f64::consts::E], 1e-9);
        assert!((logs[0] - 1e-9f64.ln()).abs() < 1e-12);
        assert_eq!(logs[1], 0.0);
        assert!((logs[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn equal_log_powers_at_the_peak_give_a_finite_frequency() {
        // Three equal powers at the winning peak make the parabola degenerate.
        let powers = vec![1.0, 1.0, 1.0, 500.0, 500.0, 500.0, 1.0, 1.0, 1.0];
        let logs = log_spectrum(&powers, 1e-9);
        let peak = parabolic(&logs, 4).unwrap();

        let frequency = 44100.0 * peak.index / 16.0;
        assert!(frequency.is_finite());
        assert!(frequency > 0.0);
        assert_eq!(peak.index, 4.0);
    }

    #[test]
    fn zero_log_floor_keeps_peak_value_finite() {
        // ln(0) on both neighbours of the peak.
        let logs = log_spectrum(&[0.0, 5.0, 0.0], 0.0);
        assert_eq!(logs[0], f64::NEG_INFINITY);

        let peak = parabolic(&logs, 1).unwrap();
        assert_eq!(peak.index, 1.0);
        assert_eq!(peak.value, 5f64.ln());

        let one_sided = parabolic(&log_spectrum(&[0.0, 5.0, 2.0], 0.0), 1).unwrap();
        assert_eq!(one_sided.index, 1.0);
        assert!(one_sided.value.is_finite());
    }

    #[test]
    fn steep_slope_at_the_low_edge_is_a_negative_frequency() {
        // Concave but nearly linear: the vertex lands far left of bin 1.
        let peak = parabolic(&[1.0, 0.6, 0.1], 1).unwrap();
        assert!((peak.index - (-3.5)).abs() < 1e-9, "got {}", peak.index);

        let result = bin_to_frequency(44100, peak.index, 1024);
        assert!(
            matches!(result, Err(EstimateError::NegativeFrequency(hz)) if hz < 0.0),
            "got {result:?}"
        );
        assert_eq!(result.unwrap_err().sentinel(), crate::INSUFFICIENT_SAMPLES);
    }

    #[test]
    fn refined_bins_convert_to_hz() {
        assert_eq!(bin_to_frequency(44100, 10.0, 1024), Ok(44100.0 * 10.0 / 1024.0));
        assert_eq!(bin_to_frequency(44100, 0.0, 1024), Ok(0.0));
    }

    #[test]
    fn estimator_does_not_validate_at_construction() {
        let estimator = FrequencyEstimator::new(44100, 1000);
        assert_eq!(estimator.config().buffer_size, 1000);
        assert_eq!(
            estimator.estimate(&vec![0.0; 1000]),
            Err(EstimateError::InvalidWindowLength(250))
        );
        assert_eq!(estimator.find_frequency(&vec![0.0; 1000]), -1.0);
    }

    #[test]
    fn short_frame_fails_before_window_check() {
        let estimator = FrequencyEstimator::new(44100, 1000);
        assert_eq!(
            estimator.estimate(&[0.0; 10]),
            Err(EstimateError::InsufficientSamples { expected: 1000, actual: 10 })
        );
    }
}

// pitch-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate estimates the fundamental frequency of one buffer of mono
//! audio at a time. It is completely headless: callers do their own audio
//! capture, framing and note naming.

pub mod config;
pub mod error;
pub mod fft;
pub mod harmonic;
pub mod pitch;
pub mod smoothing;
pub mod spectrum;
pub mod window;

pub use config::{AlgorithmParams, EstimatorConfig};
pub use error::{ConfigError, EstimateError, INSUFFICIENT_SAMPLES, SIGNAL_TOO_QUIET};
pub use pitch::FrequencyEstimator;
pub use smoothing::{Debouncer, MedianSmoother, Smoother, SmoothingStrategy};

/// Represents the result of a single successful analysis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// The detected fundamental frequency in Hz.
    pub frequency: f64,
    /// The spectrum bin that won harmonic scoring.
    pub peak_bin: usize,
    /// Fractional bin index after parabolic refinement.
    pub refined_bin: f64,
    /// Interpolated log-power at the refined bin.
    pub peak_log_power: f64,
}

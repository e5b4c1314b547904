//! # Error Types
//!
//! Typed failures for estimation and configuration. Platform bridges only see a
//! single `f64`, so every [`EstimateError`] also knows its sentinel value.

use thiserror::Error;

/// Returned when the frame holds fewer than `buffer_size` samples, the window
/// length is unusable, or the refined frequency comes out negative.
pub const INSUFFICIENT_SAMPLES: f64 = -1.0;

/// Returned when no spectral peak clears the noise floor.
pub const SIGNAL_TOO_QUIET: f64 = -2.0;

/// Reasons a single call to the estimator can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimateError {
    /// The frame is shorter than the configured buffer size.
    #[error("not enough samples: expected at least {expected}, got {actual}")]
    InsufficientSamples { expected: usize, actual: usize },

    /// Every peak candidate stayed under the noise floor.
    #[error("signal too quiet: strongest peak {peak_power:.3} below threshold {threshold:.3}")]
    SignalTooQuiet { peak_power: f64, threshold: f64 },

    /// The derived analysis window cannot be transformed or searched.
    #[error("invalid analysis window length {0}: must be a power of two large enough for the peak search")]
    InvalidWindowLength(usize),

    /// Interpolation pushed the estimate below zero.
    #[error("refined frequency {0} Hz is negative")]
    NegativeFrequency(f64),
}

impl EstimateError {
    /// Maps the error onto the numeric return channel used by the bridges.
    pub fn sentinel(&self) -> f64 {
        match self {
            EstimateError::SignalTooQuiet { .. } => SIGNAL_TOO_QUIET,
            _ => INSUFFICIENT_SAMPLES,
        }
    }
}

/// Errors raised while loading, saving or validating an estimator configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

//! # Estimator Configuration
//!
//! The immutable `(sample_rate, buffer_size)` pair an estimator is built with,
//! plus the tunable algorithm constants. Configurations can be saved to and
//! loaded from JSON so a caller can keep a tuned parameter set around.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, EstimateError};

/// Lowest bin the harmonic clamp may land on.
const MIN_HARMONIC_BIN: usize = 2;

/// Algorithm constants. The defaults are the values the estimator was tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmParams {
    /// Buffer-to-window ratio; also fixes the number of half-overlapping windows.
    pub overlap_factor: usize,
    /// How many distinct peak candidates are collected per call.
    pub peak_count: usize,
    /// A peak must exceed `mean power × noise_multiplier` to count as signal.
    pub noise_multiplier: f64,
    /// Harmonic numbers checked when scoring a candidate fundamental.
    pub harmonic_multipliers: Vec<f64>,
    /// Bins below this index (DC and near-DC) are ignored.
    pub start_bin: usize,
    /// Floor applied before taking the log of a power value.
    pub log_floor: f64,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self {
            overlap_factor: 4,
            peak_count: 5,
            noise_multiplier: 40.0,
            harmonic_multipliers: vec![2.0, 3.0, 4.0],
            start_bin: 2,
            log_floor: 1e-9,
        }
    }
}

/// Everything an estimator instance needs, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Sample rate of the incoming frames in Hz.
    pub sample_rate: u32,
    /// Number of samples consumed per call.
    pub buffer_size: usize,
    #[serde(default)]
    pub params: AlgorithmParams,
}

impl EstimatorConfig {
    /// Creates a configuration with the default algorithm constants.
    ///
    /// Nothing is validated here: a bad buffer size only shows up when a frame
    /// is analyzed. Call [`EstimatorConfig::validate`] to check it up front.
    pub fn new(sample_rate: u32, buffer_size: usize) -> Self {
        Self {
            sample_rate,
            buffer_size,
            params: AlgorithmParams::default(),
        }
    }

    pub fn with_params(mut self, params: AlgorithmParams) -> Self {
        self.params = params;
        self
    }

    /// Length of one analysis window (`buffer_size / overlap_factor`).
    pub fn window_length(&self) -> usize {
        self.buffer_size
            .checked_div(self.params.overlap_factor)
            .unwrap_or(0)
    }

    /// Number of half-overlapping windows taken from the front of a frame.
    pub fn window_count(&self) -> usize {
        (2 * self.params.overlap_factor).saturating_sub(1)
    }

    /// Number of bins in the aggregated power spectrum.
    pub fn spectrum_len(&self) -> usize {
        self.window_length() / 2 + 1
    }

    /// Width of one spectrum bin in Hz.
    pub fn bin_width_hz(&self) -> f64 {
        match self.window_length() {
            0 => 0.0,
            len => self.sample_rate as f64 / len as f64,
        }
    }

    /// Returns the window length if the transform and the peak search can run on it.
    pub(crate) fn analysis_window_length(&self) -> Result<usize, EstimateError> {
        let length = self.window_length();
        if !length.is_power_of_two() {
            return Err(EstimateError::InvalidWindowLength(length));
        }

        let spectrum_len = length / 2 + 1;
        let candidates = spectrum_len.saturating_sub(self.params.start_bin);
        // The harmonic clamp range [2, len - 3] must not be empty.
        if candidates < self.params.peak_count || spectrum_len < MIN_HARMONIC_BIN + 3 {
            return Err(EstimateError::InvalidWindowLength(length));
        }
        Ok(length)
    }

    /// Checks the configuration without analyzing any audio.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample rate must be positive".into()));
        }
        if self.params.overlap_factor == 0 {
            return Err(ConfigError::Invalid("overlap factor must be positive".into()));
        }
        if self.params.peak_count == 0 {
            return Err(ConfigError::Invalid("peak count must be positive".into()));
        }
        if self.params.harmonic_multipliers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one harmonic multiplier is required".into(),
            ));
        }
        if !(self.params.noise_multiplier > 0.0) || !(self.params.log_floor > 0.0) {
            return Err(ConfigError::Invalid(
                "noise multiplier and log floor must be positive".into(),
            ));
        }
        self.analysis_window_length()
            .map(|_| ())
            .map_err(|e| ConfigError::Invalid(format!("buffer size {}: {}", self.buffer_size, e)))
    }

    /// Loads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json_string.as_bytes())?;
        Ok(())
    }
}

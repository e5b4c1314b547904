//! # Smoothing Module
//!
//! Optional caller-side filters for a stream of per-frame estimates. The
//! estimator itself is stateless; whoever calls it frame after frame can run
//! the results through one of these to suppress single-frame glitches.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::str::FromStr;

/// Default number of estimates the median filter remembers.
pub const DEFAULT_MEDIAN_HISTORY: usize = 5;

/// Different smoothing operations that can be applied to successive estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingStrategy {
    /// Report every estimate as-is
    #[default]
    None,
    /// Median of the last few valid estimates
    Median,
    /// Three-tap debounce: the value closest to the mean of the last three
    Debounce,
}

impl FromStr for SmoothingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "median" => Ok(Self::Median),
            "debounce" => Ok(Self::Debounce),
            other => Err(format!(
                "unknown smoothing strategy '{other}' (expected none, median or debounce)"
            )),
        }
    }
}

/// Rolling median over the last `capacity` valid estimates.
///
/// Sentinels and non-finite values are passed straight through and never
/// enter the history, so a burst of quiet frames does not flush it.
#[derive(Debug, Clone)]
pub struct MedianSmoother {
    history: VecDeque<f64>,
    capacity: usize,
}

impl Default for MedianSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIAN_HISTORY)
    }
}

impl MedianSmoother {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records `frequency` and returns the median of the history.
    /// Even-length histories report the upper middle value.
    pub fn push(&mut self, frequency: f64) -> f64 {
        if !frequency.is_finite() || frequency < 0.0 {
            return frequency;
        }

        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(frequency);

        let mut sorted: Vec<f64> = self.history.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        sorted[sorted.len() / 2]
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Picks, among the current and two previous raw values, the one closest to
/// their average. Both previous slots start out at the error sentinel.
#[derive(Debug, Clone)]
pub struct Debouncer {
    prev: f64,
    prev2: f64,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self {
            prev: crate::INSUFFICIENT_SAMPLES,
            prev2: crate::INSUFFICIENT_SAMPLES,
        }
    }
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frequency: f64) -> f64 {
        let average = (self.prev + self.prev2 + frequency) / 3.0;
        let diff_prev = (self.prev - average).abs();
        let diff_prev2 = (self.prev2 - average).abs();
        let diff_freq = (frequency - average).abs();

        let chosen = if diff_prev <= diff_prev2 && diff_prev <= diff_freq {
            self.prev
        } else if diff_prev2 <= diff_prev && diff_prev2 <= diff_freq {
            self.prev2
        } else {
            frequency
        };

        self.prev2 = self.prev;
        self.prev = frequency;
        chosen
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A smoother selected at runtime from a [`SmoothingStrategy`].
#[derive(Debug, Clone)]
pub enum Smoother {
    Passthrough,
    Median(MedianSmoother),
    Debounce(Debouncer),
}

impl Smoother {
    pub fn new(strategy: SmoothingStrategy) -> Self {
        match strategy {
            SmoothingStrategy::None => Self::Passthrough,
            SmoothingStrategy::Median => Self::Median(MedianSmoother::default()),
            SmoothingStrategy::Debounce => Self::Debounce(Debouncer::new()),
        }
    }

    pub fn push(&mut self, frequency: f64) -> f64 {
        match self {
            Self::Passthrough => frequency,
            Self::Median(median) => median.push(frequency),
            Self::Debounce(debouncer) => debouncer.push(frequency),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Passthrough => {}
            Self::Median(median) => median.reset(),
            Self::Debounce(debouncer) => debouncer.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SIGNAL_TOO_QUIET;

    #[test]
    fn median_rejects_single_glitch() {
        let mut median = MedianSmoother::default();
        for _ in 0..3 {
            median.push(440.0);
        }
        assert_eq!(median.push(1000.0), 440.0);
        assert_eq!(median.push(1000.0), 440.0);
        assert_eq!(median.push(1000.0), 1000.0);
        assert_eq!(median.len(), 5);
    }

    #[test]
    fn median_uses_upper_middle_for_even_history() {
        let mut median = MedianSmoother::new(4);
        median.push(1.0);
        assert_eq!(median.push(3.0), 3.0);
        median.push(2.0);
        assert_eq!(median.push(4.0), 3.0);
    }

    #[test]
    fn median_passes_sentinels_through_without_recording() {
        let mut median = MedianSmoother::new(3);
        median.push(220.0);
        assert_eq!(median.push(SIGNAL_TOO_QUIET), SIGNAL_TOO_QUIET);
        assert!(median.push(f64::NAN).is_nan());
        assert_eq!(median.len(), 1);
    }

    #[test]
    fn median_reset_clears_history() {
        let mut median = MedianSmoother::new(0);
        median.push(100.0);
        assert_eq!(median.push(200.0), 200.0);
        median.reset();
        assert!(median.is_empty());
    }

    #[test]
    fn debouncer_holds_back_one_frame_outliers() {
        let mut debouncer = Debouncer::new();
        assert_eq!(debouncer.push(440.0), -1.0);
        assert_eq!(debouncer.push(440.0), 440.0);
        assert_eq!(debouncer.push(441.0), 440.0);
        assert_eq!(debouncer.push(1000.0), 441.0);
        assert_eq!(debouncer.push(441.0), 441.0);
    }

    #[test]
    fn strategies_parse_and_dispatch() {
        assert_eq!("Median".parse::<SmoothingStrategy>(), Ok(SmoothingStrategy::Median));
        assert_eq!("off".parse::<SmoothingStrategy>(), Ok(SmoothingStrategy::None));
        assert!("mean".parse::<SmoothingStrategy>().is_err());

        let mut passthrough = Smoother::new(SmoothingStrategy::None);
        assert_eq!(passthrough.push(123.0), 123.0);

        let mut median = Smoother::new(SmoothingStrategy::Median);
        median.push(100.0);
        median.push(100.0);
        assert_eq!(median.push(900.0), 100.0);
        median.reset();
        assert_eq!(median.push(900.0), 900.0);
    }
}

//! Simple moving average with a partial leading window.
//!
//! `out[i]` is the mean of `values[i+1-window..=i]`, or of `values[0..=i]`
//! while fewer than `window` values exist. No NaN warmup.

use super::Indicator;
use crate::domain::Bar;

/// Trailing mean over at most `window` values, defined from index 0.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "rolling window must be >= 1");
    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        result.push(sum / count as f64);
    }

    result
}

/// Rolling average of bar volume.
#[derive(Debug, Clone)]
pub struct VolumeAverage {
    window: usize,
    name: String,
}

impl VolumeAverage {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume window must be >= 1");
        Self {
            window,
            name: format!("volume_sma_{window}"),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for VolumeAverage {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        rolling_mean(&volumes, self.window)
    }
}

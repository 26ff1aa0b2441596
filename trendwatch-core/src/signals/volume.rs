//! Volume classifier: flags the latest bar's volume against its rolling average.

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::indicators::{Indicator, VolumeAverage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeCondition {
    Spike,
    Drop,
    Normal,
}

impl VolumeCondition {
    /// Spike or drop: carries information independent of the signal.
    pub fn is_event(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Latest volume, its rolling average and the resulting classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeReading {
    pub volume: f64,
    pub average: f64,
    pub condition: VolumeCondition,
}

impl VolumeReading {
    /// Volume relative to the average; `None` when the average is zero.
    pub fn ratio(&self) -> Option<f64> {
        (self.average > 0.0).then(|| self.volume / self.average)
    }
}

/// Spike when `volume > spike_ratio * avg`, drop when `volume < drop_ratio * avg`.
///
/// With `drop_ratio < 1 < spike_ratio` the two conditions cannot hold at once.
#[derive(Debug, Clone)]
pub struct VolumeClassifier {
    average: VolumeAverage,
    spike_ratio: f64,
    drop_ratio: f64,
}

impl VolumeClassifier {
    pub fn new(window: usize, spike_ratio: f64, drop_ratio: f64) -> Self {
        assert!(
            drop_ratio < 1.0 && spike_ratio > 1.0,
            "volume ratios must straddle 1.0 (drop {drop_ratio}, spike {spike_ratio})"
        );
        Self {
            average: VolumeAverage::new(window),
            spike_ratio,
            drop_ratio,
        }
    }

    pub fn window(&self) -> usize {
        self.average.window()
    }

    pub fn classify(&self, volume: f64, average: f64) -> VolumeCondition {
        if volume > self.spike_ratio * average {
            VolumeCondition::Spike
        } else if volume < self.drop_ratio * average {
            VolumeCondition::Drop
        } else {
            VolumeCondition::Normal
        }
    }

    /// Classify the last bar of `bars`. `None` for an empty slice.
    pub fn classify_latest(&self, bars: &[Bar]) -> Option<VolumeReading> {
        let last = bars.last()?;
        let average = *self.average.compute(bars).last()?;
        Some(VolumeReading {
            volume: last.volume,
            average,
            condition: self.classify(last.volume, average),
        })
    }
}

impl Default for VolumeClassifier {
    fn default() -> Self {
        Self::new(20, 1.5, 0.5)
    }
}

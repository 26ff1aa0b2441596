//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV candle for a single instrument at a single resolution step.
///
/// Volume is fractional: crypto venues report contract or coin volume with
/// decimals, so it is kept as `f64` alongside the prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Reasons a bar is rejected before it can enter a series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar at {timestamp} has non-finite field '{field}'")]
    NonFinite {
        timestamp: DateTime<Utc>,
        field: &'static str,
    },

    #[error("bar at {timestamp} has high {high} below low {low}")]
    InvertedRange {
        timestamp: DateTime<Utc>,
        high: f64,
        low: f64,
    },

    #[error("bar at {timestamp} has {field} {value} outside [{low}, {high}]")]
    OutOfRange {
        timestamp: DateTime<Utc>,
        field: &'static str,
        value: f64,
        high: f64,
        low: f64,
    },

    #[error("bar at {timestamp} has negative volume {volume}")]
    NegativeVolume {
        timestamp: DateTime<Utc>,
        volume: f64,
    },
}

impl Bar {
    /// Midpoint of the bar's range, `(high + low) / 2`.
    pub fn hl2(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// Check that every field is finite, `low <= open, close <= high`, and
    /// volume is not negative.
    pub fn validate(&self) -> Result<(), BarError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(BarError::NonFinite {
                    timestamp: self.timestamp,
                    field,
                });
            }
        }
        if self.high < self.low {
            return Err(BarError::InvertedRange {
                timestamp: self.timestamp,
                high: self.high,
                low: self.low,
            });
        }
        for (field, value) in [("open", self.open), ("close", self.close)] {
            if value < self.low || value > self.high {
                return Err(BarError::OutOfRange {
                    timestamp: self.timestamp,
                    field,
                    value,
                    high: self.high,
                    low: self.low,
                });
            }
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume {
                timestamp: self.timestamp,
                volume: self.volume,
            });
        }
        Ok(())
    }
}

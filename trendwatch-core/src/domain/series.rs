//! Candle series: validated, chronologically ordered bars.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::bar::{Bar, BarError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("candle series is empty")]
    Empty,

    #[error("timestamp {current} does not follow {previous} (series must be strictly increasing)")]
    OutOfOrder {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error(transparent)]
    InvalidBar(#[from] BarError),
}

/// Ordered sequence of bars for one instrument.
///
/// Invariants, checked on construction:
/// - at least one bar
/// - every bar passes [`Bar::validate`]
/// - timestamps strictly increase (no duplicates)
///
/// The bars are immutable once the series is built.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    bars: Vec<Bar>,
}

impl CandleSeries {
    /// Build a series from bars already in chronological order.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        if bars.is_empty() {
            return Err(SeriesError::Empty);
        }
        for bar in &bars {
            bar.validate()?;
        }
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::OutOfOrder {
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self { bars })
    }

    /// Sort by timestamp, then validate. Duplicate timestamps are still rejected.
    pub fn from_unsorted(mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        bars.sort_by_key(|b| b.timestamp);
        Self::new(bars)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar.
    pub fn last(&self) -> &Bar {
        // Non-empty by construction.
        &self.bars[self.bars.len() - 1]
    }

    pub fn into_bars(self) -> Vec<Bar> {
        self.bars
    }
}

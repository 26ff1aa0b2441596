//! Indicator implementations and the `Indicator` trait.
//!
//! Indicators are pure functions: bar history in, numeric series out. Every
//! indicator here is defined from the first bar: rolling windows shrink to the
//! bars available instead of emitting a NaN warmup prefix.

pub mod atr;
pub mod sma;
pub mod supertrend;

pub use atr::{true_range, Atr};
pub use sma::{rolling_mean, VolumeAverage};
pub use supertrend::{BandState, Supertrend, SupertrendSeries};

use crate::domain::Bar;
use thiserror::Error;

/// Trait for single-series indicators.
///
/// # Look-ahead guard
/// No output value at bar t may depend on data from bar t+1 or later.
/// `tests/supertrend_test.rs` checks this with truncated-vs-full series.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_10", "volume_sma_20").
    fn name(&self) -> &str;

    /// Number of bars before the rolling window is full. Output is still
    /// defined before that point (partial window).
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Raised before an indicator pass when the input cannot support it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputationError {
    #[error("need at least {required} bars, got {available}")]
    InsufficientBars { required: usize, available: usize },
}

/// Fail fast when fewer than `required` bars are available.
pub fn ensure_bars(available: usize, required: usize) -> Result<(), ComputationError> {
    if available < required {
        return Err(ComputationError::InsufficientBars {
            required,
            available,
        });
    }
    Ok(())
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
/// Bars are one 5-minute step apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<crate::domain::Bar> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

//! Supertrend: ATR-based directional indicator.
//!
//! Inherently sequential: each bar's final bands depend on the previous
//! bar's final bands, so the series is built with a single left-to-right
//! pass carrying `(final_upper, final_lower, in_uptrend)`.
//!
//! Band stabilization (i >= 1):
//! - final_upper resets to basic_upper when basic_upper drops below the prior
//!   final_upper or the prior close broke above it; otherwise it holds.
//! - final_lower resets to basic_lower when basic_lower rises above the prior
//!   final_lower or the prior close broke below it; otherwise it holds.
//!
//! Direction only flips when close crosses the opposite final band. Inside
//! the bands the previous direction carries over.
//!
//! Output: the active band, lower band (support) when trending up, upper
//! band (resistance) when trending down.

use super::atr::Atr;
use super::Indicator;
use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// Per-bar state of one Supertrend parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandState {
    pub basic_upper: f64,
    pub basic_lower: f64,
    pub final_upper: f64,
    pub final_lower: f64,
    pub trend_line: f64,
    pub in_uptrend: bool,
}

/// Full output of one Supertrend pass: the ATR it used and one band state per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SupertrendSeries {
    pub length: usize,
    pub multiplier: f64,
    pub atr: Vec<f64>,
    pub states: Vec<BandState>,
}

impl SupertrendSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn last(&self) -> Option<&BandState> {
        self.states.last()
    }

    /// State one bar before the last, if the series has two bars.
    pub fn previous(&self) -> Option<&BandState> {
        self.states.len().checked_sub(2).map(|i| &self.states[i])
    }

    pub fn last_atr(&self) -> Option<f64> {
        self.atr.last().copied()
    }
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    length: usize,
    multiplier: f64,
    name: String,
}

impl Supertrend {
    pub fn new(length: usize, multiplier: f64) -> Self {
        assert!(length >= 1, "Supertrend length must be >= 1");
        assert!(
            multiplier.is_finite() && multiplier > 0.0,
            "Supertrend multiplier must be > 0"
        );
        Self {
            length,
            multiplier,
            name: format!("supertrend_{length}_{multiplier}"),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Run the band engine over `bars`, computing ATR internally.
    pub fn bands(&self, bars: &[Bar]) -> SupertrendSeries {
        let atr = Atr::new(self.length).compute(bars);
        self.bands_with_atr(bars, atr)
    }

    /// Run the band engine with a precomputed ATR series of the same length.
    ///
    /// Lets two parameter sets with equal `length` share one ATR pass.
    pub fn bands_with_atr(&self, bars: &[Bar], atr: Vec<f64>) -> SupertrendSeries {
        assert_eq!(bars.len(), atr.len(), "ATR series must match bar count");
        let mut states: Vec<BandState> = Vec::with_capacity(bars.len());

        for (i, bar) in bars.iter().enumerate() {
            let mid = bar.hl2();
            let basic_upper = mid + self.multiplier * atr[i];
            let basic_lower = mid - self.multiplier * atr[i];

            let state = match states.last() {
                None => {
                    let in_uptrend = bar.close > basic_upper;
                    BandState {
                        basic_upper,
                        basic_lower,
                        final_upper: basic_upper,
                        final_lower: basic_lower,
                        trend_line: if in_uptrend { basic_lower } else { basic_upper },
                        in_uptrend,
                    }
                }
                Some(prev) => {
                    let prev_close = bars[i - 1].close;

                    let final_upper =
                        if basic_upper < prev.final_upper || prev_close > prev.final_upper {
                            basic_upper
                        } else {
                            prev.final_upper
                        };

                    let final_lower =
                        if basic_lower > prev.final_lower || prev_close < prev.final_lower {
                            basic_lower
                        } else {
                            prev.final_lower
                        };

                    let in_uptrend = if bar.close > final_upper {
                        true
                    } else if bar.close < final_lower {
                        false
                    } else {
                        prev.in_uptrend
                    };

                    BandState {
                        basic_upper,
                        basic_lower,
                        final_upper,
                        final_lower,
                        trend_line: if in_uptrend { final_lower } else { final_upper },
                        in_uptrend,
                    }
                }
            };

            states.push(state);
        }

        SupertrendSeries {
            length: self.length,
            multiplier: self.multiplier,
            atr,
            states,
        }
    }
}

impl Indicator for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.length.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.bands(bars)
            .states
            .iter()
            .map(|s| s.trend_line)
            .collect()
    }
}

//! Dual-Supertrend signal generator.
//!
//! Two Supertrend passes with the same length and different multipliers
//! (a tight "fast" band and a wide "slow" band) vote on direction:
//! - BUY when both are in an uptrend
//! - SELL when both are in a downtrend
//! - NONE when they disagree
//!
//! In crossover mode the vote must also be new: both engines agreeing on the
//! latest bar but not on the bar before.
//!
//! Levels, with `atr` taken on the latest bar:
//! - state mode: stop = the nearer-to-risk of the two trend lines
//!   (min for BUY, max for SELL)
//! - crossover mode: stop = entry ∓ 1.5 × ATR
//! - both modes: targets = entry ± 1.5 × ATR and ± 3 × ATR

use crate::domain::Bar;
use crate::indicators::supertrend::{BandState, SupertrendSeries};
use crate::indicators::{ensure_bars, ComputationError};

use super::{Signal, SignalMode, TradeLevels, TradeSignal};

const STOP_ATR: f64 = 1.5;
const TARGET1_ATR: f64 = 1.5;
const TARGET2_ATR: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    mode: SignalMode,
}

impl SignalGenerator {
    pub fn new(mode: SignalMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> SignalMode {
        self.mode
    }

    /// Bars needed to evaluate the latest bar: crossover also reads the bar before it.
    pub fn required_bars(&self) -> usize {
        match self.mode {
            SignalMode::State => 1,
            SignalMode::Crossover => 2,
        }
    }

    /// Classify the latest bar.
    ///
    /// `fast` and `slow` must be computed over `bars`.
    pub fn generate(
        &self,
        bars: &[Bar],
        fast: &SupertrendSeries,
        slow: &SupertrendSeries,
    ) -> Result<TradeSignal, ComputationError> {
        ensure_bars(bars.len(), self.required_bars())?;
        self.generate_at(bars, fast, slow, bars.len() - 1)
    }

    /// Classify bar `i`, reading only bars up to and including `i`.
    ///
    /// In crossover mode bar 0 has no predecessor and is always NONE.
    pub fn generate_at(
        &self,
        bars: &[Bar],
        fast: &SupertrendSeries,
        slow: &SupertrendSeries,
        i: usize,
    ) -> Result<TradeSignal, ComputationError> {
        ensure_bars(bars.len(), i + 1)?;
        assert_eq!(fast.len(), bars.len(), "fast Supertrend must cover every bar");
        assert_eq!(slow.len(), bars.len(), "slow Supertrend must cover every bar");

        let last = &bars[i];
        let atr = fast.atr[i];
        let (fast_now, slow_now) = (&fast.states[i], &slow.states[i]);

        let signal = match self.mode {
            SignalMode::State => agreement(fast_now, slow_now),
            SignalMode::Crossover => {
                let now = agreement(fast_now, slow_now);
                let before = match i.checked_sub(1) {
                    Some(p) => agreement(&fast.states[p], &slow.states[p]),
                    None => Signal::None,
                };
                if i > 0 && now.is_directional() && now != before {
                    now
                } else {
                    Signal::None
                }
            }
        };

        let levels = match signal {
            Signal::None => None,
            direction => Some(self.levels(direction, last.close, atr, fast_now, slow_now)),
        };

        Ok(TradeSignal {
            signal,
            levels,
            atr,
        })
    }

    fn levels(
        &self,
        direction: Signal,
        entry: f64,
        atr: f64,
        fast: &BandState,
        slow: &BandState,
    ) -> TradeLevels {
        // +1 for BUY, -1 for SELL
        let side = if direction == Signal::Buy { 1.0 } else { -1.0 };

        let stop_loss = match (self.mode, direction) {
            (SignalMode::State, Signal::Buy) => fast.trend_line.min(slow.trend_line),
            (SignalMode::State, _) => fast.trend_line.max(slow.trend_line),
            (SignalMode::Crossover, _) => entry - side * STOP_ATR * atr,
        };

        TradeLevels {
            entry,
            stop_loss,
            target1: entry + side * TARGET1_ATR * atr,
            target2: entry + side * TARGET2_ATR * atr,
        }
    }
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new(SignalMode::default())
    }
}

fn agreement(fast: &BandState, slow: &BandState) -> Signal {
    match (fast.in_uptrend, slow.in_uptrend) {
        (true, true) => Signal::Buy,
        (false, false) => Signal::Sell,
        _ => Signal::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn state(in_uptrend: bool, trend_line: f64) -> BandState {
        BandState {
            basic_upper: trend_line,
            basic_lower: trend_line,
            final_upper: trend_line,
            final_lower: trend_line,
            trend_line,
            in_uptrend,
        }
    }

    /// Hand-built series so each test controls the trend flags directly.
    fn series(flags: &[(bool, f64)], atr: f64) -> SupertrendSeries {
        SupertrendSeries {
            length: 10,
            multiplier: 1.0,
            atr: vec![atr; flags.len()],
            states: flags.iter().map(|&(up, line)| state(up, line)).collect(),
        }
    }

    #[test]
    fn state_mode_buy_when_both_up() {
        let bars = make_bars(&[100.0, 104.0]);
        let fast = series(&[(false, 0.0), (true, 101.0)], 2.0);
        let slow = series(&[(false, 0.0), (true, 98.0)], 2.0);
        let out = SignalGenerator::new(SignalMode::State)
            .generate(&bars, &fast, &slow)
            .unwrap();

        assert_eq!(out.signal, Signal::Buy);
        let levels = out.levels.unwrap();
        assert_approx(levels.entry, 104.0, DEFAULT_EPSILON);
        assert_approx(levels.stop_loss, 98.0, DEFAULT_EPSILON);
        assert_approx(levels.target1, 107.0, DEFAULT_EPSILON);
        assert_approx(levels.target2, 110.0, DEFAULT_EPSILON);
    }

    #[test]
    fn state_mode_sell_when_both_down() {
        let bars = make_bars(&[100.0, 96.0]);
        let fast = series(&[(true, 0.0), (false, 99.0)], 2.0);
        let slow = series(&[(true, 0.0), (false, 103.0)], 2.0);
        let out = SignalGenerator::new(SignalMode::State)
            .generate(&bars, &fast, &slow)
            .unwrap();

        assert_eq!(out.signal, Signal::Sell);
        let levels = out.levels.unwrap();
        assert_approx(levels.stop_loss, 103.0, DEFAULT_EPSILON);
        assert_approx(levels.target1, 93.0, DEFAULT_EPSILON);
        assert_approx(levels.target2, 90.0, DEFAULT_EPSILON);
    }

    #[test]
    fn state_mode_none_on_disagreement() {
        let bars = make_bars(&[100.0, 101.0]);
        let fast = series(&[(true, 0.0), (true, 99.0)], 2.0);
        let slow = series(&[(true, 0.0), (false, 103.0)], 2.0);
        let out = SignalGenerator::default().generate(&bars, &fast, &slow).unwrap();
        assert_eq!(out.signal, Signal::None);
        assert!(out.levels.is_none());
    }

    #[test]
    fn state_mode_repeats_while_agreement_persists() {
        let bars = make_bars(&[100.0, 101.0]);
        let fast = series(&[(true, 98.0), (true, 99.0)], 1.0);
        let slow = series(&[(true, 95.0), (true, 96.0)], 1.0);
        let out = SignalGenerator::new(SignalMode::State)
            .generate(&bars, &fast, &slow)
            .unwrap();
        assert_eq!(out.signal, Signal::Buy);
    }

    #[test]
    fn crossover_fires_only_on_transition() {
        let bars = make_bars(&[100.0, 101.0]);
        let generator = SignalGenerator::new(SignalMode::Crossover);

        let fast = series(&[(true, 98.0), (true, 99.0)], 1.0);
        let slow = series(&[(true, 95.0), (true, 96.0)], 1.0);
        assert_eq!(generator.generate(&bars, &fast, &slow).unwrap().signal, Signal::None);

        let slow = series(&[(false, 105.0), (true, 96.0)], 1.0);
        let out = generator.generate(&bars, &fast, &slow).unwrap();
        assert_eq!(out.signal, Signal::Buy);
        let levels = out.levels.unwrap();
        assert_approx(levels.entry, 101.0, DEFAULT_EPSILON);
        assert_approx(levels.stop_loss, 99.5, DEFAULT_EPSILON);
        assert_approx(levels.target1, 102.5, DEFAULT_EPSILON);
        assert_approx(levels.target2, 104.0, DEFAULT_EPSILON);
    }

    #[test]
    fn crossover_sell_on_transition_from_disagreement() {
        let bars = make_bars(&[100.0, 97.0]);
        let fast = series(&[(false, 101.0), (false, 100.0)], 2.0);
        let slow = series(&[(true, 90.0), (false, 104.0)], 2.0);
        let out = SignalGenerator::new(SignalMode::Crossover)
            .generate(&bars, &fast, &slow)
            .unwrap();
        assert_eq!(out.signal, Signal::Sell);
        let levels = out.levels.unwrap();
        assert_approx(levels.stop_loss, 100.0, DEFAULT_EPSILON);
        assert_approx(levels.target1, 94.0, DEFAULT_EPSILON);
        assert_approx(levels.target2, 91.0, DEFAULT_EPSILON);
    }

    #[test]
    fn crossover_needs_two_bars() {
        let bars = make_bars(&[100.0]);
        let fast = series(&[(true, 99.0)], 1.0);
        let slow = series(&[(true, 98.0)], 1.0);
        let err = SignalGenerator::new(SignalMode::Crossover)
            .generate(&bars, &fast, &slow)
            .unwrap_err();
        assert_eq!(
            err,
            ComputationError::InsufficientBars {
                required: 2,
                available: 1
            }
        );
        // State mode is defined on a single bar.
        assert!(SignalGenerator::new(SignalMode::State)
            .generate(&bars, &fast, &slow)
            .is_ok());
    }

    #[test]
    fn generate_at_matches_generate_on_prefix() {
        let bars = make_bars(&[100.0, 101.0, 99.0]);
        let fast = series(&[(false, 101.0), (true, 99.0), (true, 98.0)], 1.0);
        let slow = series(&[(false, 103.0), (true, 96.0), (false, 102.0)], 1.0);
        let generator = SignalGenerator::new(SignalMode::Crossover);

        assert_eq!(
            generator.generate_at(&bars, &fast, &slow, 0).unwrap().signal,
            Signal::None
        );
        assert_eq!(
            generator.generate_at(&bars, &fast, &slow, 1).unwrap().signal,
            Signal::Buy
        );
        assert_eq!(
            generator.generate_at(&bars, &fast, &slow, 2).unwrap(),
            generator.generate(&bars, &fast, &slow).unwrap()
        );
    }
}

//! Signal generation: combines two Supertrend passes into a directional call.
//!
//! Signals describe the market on the latest bar only. Whether a signal is
//! worth alerting is decided later by the alert gate.

pub mod generator;
pub mod volume;

pub use generator::SignalGenerator;
pub use volume::{VolumeClassifier, VolumeCondition, VolumeReading};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directional classification of the latest bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    None,
}

impl Signal {
    /// BUY or SELL.
    pub fn is_directional(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry, stop and targets attached to a BUY or SELL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
}

/// Output of the signal generator for one bar.
///
/// `levels` is `Some` exactly when `signal` is directional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub signal: Signal,
    pub levels: Option<TradeLevels>,
    /// ATR on the evaluated bar, used for the target offsets.
    pub atr: f64,
}

impl TradeSignal {
    pub fn none(atr: f64) -> Self {
        Self {
            signal: Signal::None,
            levels: None,
            atr,
        }
    }
}

/// How agreement between the two Supertrends becomes a signal.
///
/// - `State` re-signals on every bar where both engines agree.
/// - `Crossover` signals only on the bar where they come into agreement.
///
/// `State` is the default. Repeats are collapsed later by the alert gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    #[default]
    State,
    Crossover,
}

impl FromStr for SignalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "state" => Ok(Self::State),
            "crossover" => Ok(Self::Crossover),
            other => Err(format!(
                "unknown signal mode '{other}' (expected 'state' or 'crossover')"
            )),
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State => f.write_str("state"),
            Self::Crossover => f.write_str("crossover"),
        }
    }
}

//! Candle provider trait, request types and structured error types.
//!
//! The `CandleProvider` trait abstracts over candle sources (Delta Exchange,
//! synthetic random walk, fixed fixtures) so the check cycle can be driven
//! without network access in tests.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CandleSeries, SeriesError, Symbol};

/// Structured error types for candle fetches.
///
/// Every variant means "no signal this cycle"; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("no candle data: {0}")]
    DataUnavailable(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("invalid candle series: {0}")]
    InvalidSeries(#[from] SeriesError),
}

/// Candle width, stored in seconds and written in exchange notation ("5m", "1h").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    seconds: i64,
}

impl Resolution {
    pub const FIVE_MINUTES: Self = Self { seconds: 300 };

    pub fn from_seconds(seconds: i64) -> Option<Self> {
        (seconds > 0).then_some(Self { seconds })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("resolution '{s}' has no unit (expected e.g. 5m, 1h, 1d)"))?;
        let (count, unit) = s.split_at(split);
        let count: i64 = count
            .parse()
            .map_err(|_| format!("resolution '{s}' has no count"))?;
        let unit_seconds = match unit {
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            "w" => 604_800,
            other => return Err(format!("unknown resolution unit '{other}' in '{s}'")),
        };
        Self::from_seconds(count * unit_seconds)
            .ok_or_else(|| format!("resolution '{s}' must be positive"))
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.seconds;
        if s % 604_800 == 0 {
            write!(f, "{}w", s / 604_800)
        } else if s % 86_400 == 0 {
            write!(f, "{}d", s / 86_400)
        } else if s % 3_600 == 0 {
            write!(f, "{}h", s / 3_600)
        } else if s % 60 == 0 {
            write!(f, "{}m", s / 60)
        } else {
            write!(f, "{s}s")
        }
    }
}

/// Parameters of one candle fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleRequest {
    pub symbol: Symbol,
    pub resolution: Resolution,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: usize,
}

impl CandleRequest {
    /// The last `limit` candles ending at `now`.
    pub fn trailing(
        symbol: impl Into<Symbol>,
        resolution: Resolution,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let span = Duration::seconds(resolution.seconds() * limit as i64);
        Self {
            symbol: symbol.into(),
            resolution,
            start: now - span,
            end: now,
            limit,
        }
    }
}

/// Trait for candle sources.
pub trait CandleProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for the request, ordered oldest first.
    ///
    /// An empty result must be reported as `DataError::DataUnavailable`,
    /// never as an empty series.
    fn fetch(&self, request: &CandleRequest) -> Result<CandleSeries, DataError>;
}

/// Provider that replays canned responses, oldest first.
///
/// The final response repeats once the script is exhausted.
#[derive(Debug)]
pub struct StaticProvider {
    responses: Mutex<VecDeque<Result<CandleSeries, DataError>>>,
}

impl StaticProvider {
    pub fn new(series: CandleSeries) -> Self {
        Self::scripted(vec![Ok(series)])
    }

    pub fn failing(error: DataError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn scripted(responses: Vec<Result<CandleSeries, DataError>>) -> Self {
        assert!(!responses.is_empty(), "scripted provider needs a response");
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

impl CandleProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn fetch(&self, _request: &CandleRequest) -> Result<CandleSeries, DataError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| DataError::DataUnavailable("static provider poisoned".into()))?;
        if responses.len() > 1 {
            if let Some(next) = responses.pop_front() {
                return next;
            }
        }
        responses
            .front()
            .cloned()
            .unwrap_or_else(|| Err(DataError::DataUnavailable("no scripted response".into())))
    }
}

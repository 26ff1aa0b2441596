//! Delta Exchange candle provider.
//!
//! Fetches OHLCV candles from the public `/v2/history/candles` endpoint. The
//! endpoint requires explicit `start` and `end` unix timestamps alongside the
//! symbol and resolution, and returns candles newest first.
//!
//! There is no retry: a failed fetch skips one cycle and the scheduler tries
//! again at the next interval.

use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;

use super::provider::{CandleProvider, CandleRequest, DataError};
use crate::domain::{Bar, CandleSeries};

pub const DEFAULT_BASE_URL: &str = "https://api.delta.exchange";

/// Candle history response envelope.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    result: Option<Vec<CandleRow>>,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    time: i64,
    open: Number,
    high: Number,
    low: Number,
    close: Number,
    volume: Number,
}

/// Prices arrive as JSON numbers on some endpoints and as strings on others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Float(f64),
    Text(String),
}

impl Number {
    fn value(&self, field: &str, time: i64) -> Result<f64, DataError> {
        match self {
            Self::Float(v) => Ok(*v),
            Self::Text(s) => s.trim().parse().map_err(|_| {
                DataError::DataUnavailable(format!(
                    "candle at {time} has non-numeric {field}: '{s}'"
                ))
            }),
        }
    }
}

pub struct DeltaProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl DeltaProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("trendwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn candles_url(&self) -> String {
        format!("{}/v2/history/candles", self.base_url)
    }

    /// Parse a candle history body into a chronologically ordered series.
    fn parse_response(body: &str) -> Result<CandleSeries, DataError> {
        let resp: HistoryResponse = serde_json::from_str(body).map_err(|e| {
            DataError::DataUnavailable(format!("malformed candle response: {e}"))
        })?;

        let rows = resp.result.unwrap_or_default();
        if rows.is_empty() {
            return Err(DataError::DataUnavailable(format!(
                "no candles returned: {}",
                truncate(body, 200)
            )));
        }

        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp = DateTime::from_timestamp(row.time, 0).ok_or_else(|| {
                DataError::DataUnavailable(format!("invalid candle timestamp: {}", row.time))
            })?;
            bars.push(Bar {
                timestamp,
                open: row.open.value("open", row.time)?,
                high: row.high.value("high", row.time)?,
                low: row.low.value("low", row.time)?,
                close: row.close.value("close", row.time)?,
                volume: row.volume.value("volume", row.time)?,
            });
        }

        Ok(CandleSeries::from_unsorted(bars)?)
    }
}

impl CandleProvider for DeltaProvider {
    fn name(&self) -> &str {
        "delta_exchange"
    }

    fn fetch(&self, request: &CandleRequest) -> Result<CandleSeries, DataError> {
        let resp = self
            .client
            .get(self.candles_url())
            .query(&[
                ("symbol", request.symbol.clone()),
                ("resolution", request.resolution.to_string()),
                ("start", request.start.timestamp().to_string()),
                ("end", request.end.timestamp().to_string()),
                ("limit", request.limit.to_string()),
            ])
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(DataError::Upstream {
                status: status.as_u16(),
                body: truncate(&body, 500).to_string(),
            });
        }

        Self::parse_response(&body)
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

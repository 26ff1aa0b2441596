//! Offline scan of a candle CSV: per-bar trend flags and signals.
//!
//! Input columns: `timestamp,open,high,low,close,volume`. The timestamp is
//! either unix seconds or RFC 3339. Rows may be in any order.

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trendwatch_core::config::MonitorConfig;
use trendwatch_core::domain::{Bar, CandleSeries};
use trendwatch_core::indicators::{Atr, Indicator, Supertrend, VolumeAverage};
use trendwatch_core::signals::{Signal, VolumeCondition};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Unix(i64),
    Text(String),
}

impl Timestamp {
    fn to_utc(&self) -> Result<DateTime<Utc>> {
        match self {
            Self::Unix(secs) => DateTime::from_timestamp(*secs, 0)
                .with_context(|| format!("timestamp {secs} out of range")),
            Self::Text(text) => Ok(DateTime::parse_from_rfc3339(text.trim())
                .with_context(|| format!("bad timestamp '{text}'"))?
                .with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CandleRecord {
    timestamp: Timestamp,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Serialize)]
struct ScanRow {
    timestamp: DateTime<Utc>,
    close: f64,
    atr: f64,
    fast_line: f64,
    slow_line: f64,
    fast_up: bool,
    slow_up: bool,
    signal: Signal,
    volume: f64,
    avg_volume: f64,
    volume_condition: VolumeCondition,
}

pub fn read_candles(input: impl Read) -> Result<CandleSeries> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let mut bars = Vec::new();
    for (line, record) in reader.deserialize::<CandleRecord>().enumerate() {
        let r = record.with_context(|| format!("candle row {}", line + 1))?;
        bars.push(Bar {
            timestamp: r.timestamp.to_utc()?,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        });
    }
    if bars.is_empty() {
        bail!("candle file has no rows");
    }
    Ok(CandleSeries::from_unsorted(bars)?)
}

/// Write one CSV row per bar. Returns the number of bars written.
///
/// Every bar is evaluated, including those before `min_bars`; their ATR and
/// volume average use partial windows.
pub fn scan(config: &MonitorConfig, series: &CandleSeries, out: impl Write) -> Result<usize> {
    let bars = series.bars();
    let ind = &config.indicator;

    let atr = Atr::new(ind.length).compute(bars);
    let fast = Supertrend::new(ind.length, ind.multiplier1).bands_with_atr(bars, atr.clone());
    let slow = Supertrend::new(ind.length, ind.multiplier2).bands_with_atr(bars, atr.clone());
    let avg_volume = VolumeAverage::new(config.volume.rolling_window).compute(bars);
    let generator = config.signal_generator();
    let classifier = config.volume_classifier();

    let mut writer = csv::Writer::from_writer(out);
    for (i, bar) in bars.iter().enumerate() {
        let trade = generator.generate_at(bars, &fast, &slow, i)?;
        writer.serialize(ScanRow {
            timestamp: bar.timestamp,
            close: bar.close,
            atr: atr[i],
            fast_line: fast.states[i].trend_line,
            slow_line: slow.states[i].trend_line,
            fast_up: fast.states[i].in_uptrend,
            slow_up: slow.states[i].in_uptrend,
            signal: trade.signal,
            volume: bar.volume,
            avg_volume: avg_volume[i],
            volume_condition: classifier.classify(bar.volume, avg_volume[i]),
        })?;
    }
    writer.flush()?;
    Ok(bars.len())
}

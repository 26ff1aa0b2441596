//! Alert payloads: the human-readable message and the journal row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::signals::{Signal, TradeSignal, VolumeCondition, VolumeReading};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// One journal line. Columns follow the order of the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub timestamp: DateTime<Utc>,
    pub candle_time: DateTime<Utc>,
    pub close: f64,
    pub volume: f64,
    pub signal: Signal,
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub target1: Option<f64>,
    pub target2: Option<f64>,
}

/// A composed alert, ready for every sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Telegram-flavoured HTML text.
    pub message: String,
    pub row: AlertRow,
}

impl Alert {
    /// Build the message and row for the latest bar.
    pub fn compose(
        symbol: &str,
        bar: &Bar,
        trade: &TradeSignal,
        volume: &VolumeReading,
        now: DateTime<Utc>,
    ) -> Self {
        let candle = bar.timestamp.format(TIME_FORMAT);
        let volume_line = format!(
            "Volume: {:.2} (avg: {:.2})",
            volume.volume, volume.average
        );

        let mut message = match (trade.signal, trade.levels) {
            (Signal::Buy | Signal::Sell, Some(levels)) => format!(
                "<b>{symbol} {} SIGNAL</b>\n\n\
                 Candle: {candle}\n\
                 Entry: {:.2}\n\
                 Stop-Loss: {:.2}\n\
                 Target 1: {:.2}\n\
                 Target 2: {:.2}\n\
                 {volume_line}",
                trade.signal, levels.entry, levels.stop_loss, levels.target1, levels.target2,
            ),
            _ => format!("<b>No clear signal for {symbol}</b>\n\nCandle: {candle}\n{volume_line}"),
        };

        match volume.condition {
            VolumeCondition::Spike => message.push_str("\n<b>Major volume spike detected!</b>"),
            VolumeCondition::Drop => message.push_str("\n<b>Major volume decline detected!</b>"),
            VolumeCondition::Normal => {}
        }

        let levels = trade.levels;
        Self {
            message,
            row: AlertRow {
                timestamp: now,
                candle_time: bar.timestamp,
                close: bar.close,
                volume: volume.volume,
                signal: trade.signal,
                entry: levels.map(|l| l.entry),
                stop_loss: levels.map(|l| l.stop_loss),
                target1: levels.map(|l| l.target1),
                target2: levels.map(|l| l.target2),
            },
        }
    }
}

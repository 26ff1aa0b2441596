//! Alert delivery: the sink trait, the concrete sinks and the fan-out notifier.
//!
//! Sinks are independent. One failing sink is logged and never stops the
//! others from receiving the same alert.

pub mod bell;
pub mod journal;
pub mod message;
pub mod telegram;

pub use bell::TerminalBell;
pub use journal::CsvJournal;
pub use message::{Alert, AlertRow};
pub use telegram::TelegramSink;

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Destination for composed alerts.
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, alert: &Alert) -> Result<(), SinkError>;
}

/// Delivers each alert to every registered sink.
#[derive(Default)]
pub struct Notifier {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl AlertSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn AlertSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    /// Deliver to all sinks. Returns the failures as `(sink name, error)`.
    pub fn notify(&self, alert: &Alert) -> Vec<(String, SinkError)> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            match sink.deliver(alert) {
                Ok(()) => debug!(sink = sink.name(), "alert delivered"),
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "alert delivery failed");
                    failures.push((sink.name().to_string(), e));
                }
            }
        }
        failures
    }
}

/// Sink that keeps every alert in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().map(|alerts| alerts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn deliver(&self, alert: &Alert) -> Result<(), SinkError> {
        self.alerts
            .lock()
            .map_err(|_| SinkError::Delivery("memory sink poisoned".into()))?
            .push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_alert() -> Alert {
    use crate::signals::{TradeSignal, VolumeCondition, VolumeReading};
    let bar = crate::indicators::make_bars(&[100.0])[0];
    let volume = VolumeReading {
        volume: 1_000.0,
        average: 1_000.0,
        condition: VolumeCondition::Normal,
    };
    Alert::compose("BTCUSD", &bar, &TradeSignal::none(1.0), &volume, bar.timestamp)
}

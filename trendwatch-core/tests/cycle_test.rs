//! End-to-end check cycle tests with file-backed state and journal.

use std::cell::Cell;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use trendwatch_core::alerts::{AlertReason, GateDecision, JsonStateStore, StateStore};
use trendwatch_core::config::MonitorConfig;
use trendwatch_core::data::{CandleProvider, DataError, StaticProvider, SyntheticProvider};
use trendwatch_core::domain::{Bar, CandleSeries};
use trendwatch_core::engine::{CheckCycle, Clock, Scheduler};
use trendwatch_core::notify::{AlertRow, CsvJournal, MemorySink, Notifier};
use trendwatch_core::signals::Signal;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn series(closes: impl Iterator<Item = f64>, last_volume: f64) -> CandleSeries {
    let closes: Vec<f64> = closes.collect();
    let n = closes.len();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: t0() + chrono::Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: if i + 1 == n { last_volume } else { 1_000.0 },
            }
        })
        .collect();
    CandleSeries::new(bars).unwrap()
}

fn rally() -> CandleSeries {
    series((0..60).map(|i| 100.0 + i as f64), 1_000.0)
}

fn selloff() -> CandleSeries {
    series((0..60).map(|i| 200.0 - i as f64), 1_000.0)
}

fn config(dir: &Path) -> MonitorConfig {
    let mut config = MonitorConfig::default();
    config.fetch_limit = 60;
    config.storage.state_file = dir.join("state/last_signal_state.json");
    config.storage.journal_file = dir.join("signals.csv");
    config
}

fn build(
    config: &MonitorConfig,
    provider: impl CandleProvider + 'static,
    alerts: &MemorySink,
) -> CheckCycle<JsonStateStore> {
    CheckCycle::new(
        config.clone(),
        Box::new(provider),
        JsonStateStore::new(&config.storage.state_file),
    )
    .with_notifier(Notifier::new().with_sink(alerts.clone()))
    .with_journal(CsvJournal::new(&config.storage.journal_file))
}

fn journal_rows(path: &Path) -> Vec<AlertRow> {
    if !path.exists() {
        return Vec::new();
    }
    csv::Reader::from_path(path)
        .unwrap()
        .deserialize()
        .map(|r| r.unwrap())
        .collect()
}

#[test]
fn dedup_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let alerts = MemorySink::new();

    let report = build(&config, StaticProvider::new(rally()), &alerts)
        .run(t0())
        .unwrap();
    assert_eq!(report.decision, GateDecision::Emit(AlertReason::NewSignal));
    assert_eq!(report.trade.signal, Signal::Buy);

    // Fresh process: the state file is all that carries over.
    let report = build(&config, StaticProvider::new(rally()), &alerts)
        .run(t0())
        .unwrap();
    assert_eq!(report.decision, GateDecision::Suppressed);

    assert_eq!(alerts.len(), 1);
    let rows = journal_rows(&config.storage.journal_file);
    assert_eq!(rows.len(), 1, "suppressed cycles are not journaled");
    assert_eq!(rows[0].signal, Signal::Buy);
    assert_eq!(rows[0].close, 159.0);
    assert!(rows[0].stop_loss.is_some());
}

#[test]
fn reversal_then_spike_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let alerts = MemorySink::new();
    let provider = StaticProvider::scripted(vec![
        Ok(rally()),
        Ok(rally()),
        Ok(selloff()),
        Ok(series((0..60).map(|i| 200.0 - i as f64), 9_000.0)),
    ]);
    let mut cycle = build(&config, provider, &alerts);

    let decisions: Vec<GateDecision> = (0..4)
        .map(|_| cycle.run(t0()).unwrap().decision)
        .collect();
    assert_eq!(
        decisions,
        vec![
            GateDecision::Emit(AlertReason::NewSignal),
            GateDecision::Suppressed,
            GateDecision::Emit(AlertReason::NewSignal),
            GateDecision::Emit(AlertReason::VolumeSpike),
        ]
    );
    assert_eq!(alerts.len(), 3);
    assert!(alerts.alerts()[2].message.contains("SELL"));
    assert!(alerts.alerts()[2].message.contains("Major volume spike"));

    let store = JsonStateStore::new(&config.storage.state_file);
    assert_eq!(store.load().unwrap().last_signal, Some(Signal::Sell));
    assert_eq!(journal_rows(&config.storage.journal_file).len(), 3);
}

#[test]
fn failed_fetch_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let alerts = MemorySink::new();
    let mut cycle = build(
        &config,
        StaticProvider::failing(DataError::DataUnavailable("no candles returned".into())),
        &alerts,
    );

    assert!(cycle.run(t0()).is_err());
    assert!(alerts.is_empty());
    assert!(!config.storage.state_file.exists());
    assert!(!config.storage.journal_file.exists());
}

#[test]
fn synthetic_feed_runs_through_scheduler() {
    struct StepClock(Cell<DateTime<Utc>>);

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.get()
        }
        fn sleep(&self, d: Duration) {
            self.0.set(self.0.get() + chrono::Duration::from_std(d).unwrap());
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.fetch_limit = 200;
    let alerts = MemorySink::new();
    let mut cycle = build(&config, SyntheticProvider::new(50_000.0), &alerts);

    let scheduler = Scheduler::with_clock(config.check_interval(), StepClock(Cell::new(t0())))
        .max_cycles(5);
    let summary = scheduler.run(|now| cycle.run(now));

    assert_eq!(summary.cycles, 5);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.emitted, alerts.len());
    // Every emitted alert is journaled too.
    assert!(journal_rows(&config.storage.journal_file).len() >= alerts.len());
}

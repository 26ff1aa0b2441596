//! One check cycle: fetch, compute, gate, notify, persist.
//!
//! ```text
//! load state -> fetch candles -> length check -> ATR -> fast/slow Supertrend
//!   -> signal -> volume -> low-volume filter -> gate -> notify -> save state
//! ```
//!
//! Any error before the gate skips the cycle with no side effects. Sink
//! failures after the gate are logged and never fail the cycle. A failed
//! state save after delivery fails the cycle, so the next one may repeat
//! the alert.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::alerts::{AlertGate, GateDecision, StateError, StateStore};
use crate::config::MonitorConfig;
use crate::data::{CandleProvider, CandleRequest, DataError};
use crate::domain::{Bar, CandleSeries};
use crate::indicators::{ensure_bars, Atr, ComputationError, Indicator, Supertrend};
use crate::notify::{Alert, AlertSink, Notifier};
use crate::signals::{SignalGenerator, TradeSignal, VolumeClassifier, VolumeReading};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error(transparent)]
    State(#[from] StateError),
}

impl CycleError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data(DataError::Upstream { .. }) => "upstream",
            Self::Data(DataError::NetworkUnreachable(_)) => "network",
            Self::Data(_) => "data_unavailable",
            Self::Computation(_) => "computation",
            Self::State(_) => "state",
        }
    }
}

/// Indicator results for the latest bar, before the gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub bar: Bar,
    pub trade: TradeSignal,
    pub volume: VolumeReading,
    /// A directional call was replaced by NONE because volume was too thin.
    pub low_volume: bool,
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleReport {
    pub candle_time: DateTime<Utc>,
    pub close: f64,
    pub trade: TradeSignal,
    pub volume: VolumeReading,
    pub low_volume: bool,
    pub decision: GateDecision,
    /// Number of sinks that failed to take the alert.
    pub sink_failures: usize,
}

/// Indicator pipeline derived from the monitor config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    min_bars: usize,
    atr: Atr,
    fast: Supertrend,
    slow: Supertrend,
    generator: SignalGenerator,
    classifier: VolumeClassifier,
    min_volume_ratio: Option<f64>,
}

impl Pipeline {
    pub fn from_config(config: &MonitorConfig) -> Self {
        let ind = &config.indicator;
        Self {
            min_bars: config.min_bars(),
            atr: Atr::new(ind.length),
            fast: Supertrend::new(ind.length, ind.multiplier1),
            slow: Supertrend::new(ind.length, ind.multiplier2),
            generator: config.signal_generator(),
            classifier: config.volume_classifier(),
            min_volume_ratio: config.volume.min_ratio,
        }
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }

    /// Evaluate the latest bar of `series`. Pure: no I/O, no state.
    pub fn evaluate(&self, series: &CandleSeries) -> Result<Evaluation, ComputationError> {
        let bars = series.bars();
        ensure_bars(bars.len(), self.min_bars)?;

        let atr = self.atr.compute(bars);
        let fast = self.fast.bands_with_atr(bars, atr.clone());
        let slow = self.slow.bands_with_atr(bars, atr);

        let mut trade = self.generator.generate(bars, &fast, &slow)?;
        let volume = self
            .classifier
            .classify_latest(bars)
            .ok_or(ComputationError::InsufficientBars {
                required: 1,
                available: 0,
            })?;

        let mut low_volume = false;
        if let Some(min_ratio) = self.min_volume_ratio {
            if trade.signal.is_directional() && volume.volume < min_ratio * volume.average {
                trade = TradeSignal::none(trade.atr);
                low_volume = true;
            }
        }

        Ok(Evaluation {
            bar: *series.last(),
            trade,
            volume,
            low_volume,
        })
    }
}

/// The check cycle with its collaborators.
///
/// Alerts go to `notifier`. The journal receives every cycle that is not
/// suppressed, including quiet ones.
pub struct CheckCycle<S: StateStore> {
    config: MonitorConfig,
    pipeline: Pipeline,
    provider: Box<dyn CandleProvider>,
    store: S,
    notifier: Notifier,
    journal: Option<Box<dyn AlertSink>>,
}

impl<S: StateStore> CheckCycle<S> {
    pub fn new(config: MonitorConfig, provider: Box<dyn CandleProvider>, store: S) -> Self {
        Self {
            pipeline: Pipeline::from_config(&config),
            config,
            provider,
            store,
            notifier: Notifier::new(),
            journal: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_journal(mut self, journal: impl AlertSink + 'static) -> Self {
        self.journal = Some(Box::new(journal));
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn run(&mut self, now: DateTime<Utc>) -> Result<CycleReport, CycleError> {
        let symbol = self.config.symbol.as_str();
        let mut gate = AlertGate::new(self.store.load()?);

        let request = CandleRequest::trailing(
            symbol,
            self.config.resolution,
            self.config.fetch_limit,
            now,
        );
        let series = self.provider.fetch(&request)?;
        debug!(
            symbol,
            provider = self.provider.name(),
            bars = series.len(),
            "candles fetched"
        );

        let eval = self.pipeline.evaluate(&series)?;
        let (decision, changed) = gate.process(eval.trade.signal, eval.volume.condition);
        let alert = Alert::compose(symbol, &eval.bar, &eval.trade, &eval.volume, now);

        let mut sink_failures = 0;
        match decision {
            GateDecision::Suppressed => {
                info!(symbol, signal = %eval.trade.signal, "no new signal, same as last alert");
            }
            GateDecision::Quiet => {
                sink_failures += self.write_journal(&alert);
                info!(
                    symbol,
                    low_volume = eval.low_volume,
                    "no trading signal"
                );
            }
            GateDecision::Emit(reason) => {
                sink_failures += self.notifier.notify(&alert).len();
                sink_failures += self.write_journal(&alert);
                if changed {
                    if let Err(e) = self.store.save(&gate.state()) {
                        error!(
                            symbol,
                            signal = %eval.trade.signal,
                            error = %e,
                            "alert emitted, state not persisted"
                        );
                        return Err(e.into());
                    }
                }
                info!(
                    symbol,
                    signal = %eval.trade.signal,
                    %reason,
                    volume = eval.volume.volume,
                    avg_volume = eval.volume.average,
                    "alert emitted"
                );
            }
        }

        Ok(CycleReport {
            candle_time: eval.bar.timestamp,
            close: eval.bar.close,
            trade: eval.trade,
            volume: eval.volume,
            low_volume: eval.low_volume,
            decision,
            sink_failures,
        })
    }

    fn write_journal(&self, alert: &Alert) -> usize {
        let Some(journal) = &self.journal else {
            return 0;
        };
        match journal.deliver(alert) {
            Ok(()) => 0,
            Err(e) => {
                warn!(sink = journal.name(), error = %e, "journal write failed");
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertReason, AlertState, MemoryStateStore};
    use crate::data::StaticProvider;
    use crate::indicators::make_bars;
    use crate::notify::{MemorySink, SinkError};
    use crate::signals::{Signal, SignalMode};

    fn small_config() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.indicator.length = 3;
        config.volume.rolling_window = 3;
        config.fetch_limit = 50;
        config
    }

    fn rising() -> CandleSeries {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + 2.0 * i as f64).collect();
        CandleSeries::new(make_bars(&closes)).unwrap()
    }

    fn falling() -> CandleSeries {
        let closes: Vec<f64> = (0..30).map(|i| 200.0 - 2.0 * i as f64).collect();
        CandleSeries::new(make_bars(&closes)).unwrap()
    }

    fn with_volume(series: CandleSeries, last_volume: f64) -> CandleSeries {
        let mut bars = series.into_bars();
        if let Some(last) = bars.last_mut() {
            last.volume = last_volume;
        }
        CandleSeries::new(bars).unwrap()
    }

    fn cycle(
        config: MonitorConfig,
        responses: Vec<Result<CandleSeries, DataError>>,
        state: AlertState,
    ) -> (CheckCycle<MemoryStateStore>, MemorySink, MemorySink) {
        let alerts = MemorySink::new();
        let journal = MemorySink::new();
        let cycle = CheckCycle::new(
            config,
            Box::new(StaticProvider::scripted(responses)),
            MemoryStateStore::new(state),
        )
        .with_notifier(Notifier::new().with_sink(alerts.clone()))
        .with_journal(journal.clone());
        (cycle, alerts, journal)
    }

    #[test]
    fn pipeline_rejects_short_series() {
        let pipeline = Pipeline::from_config(&MonitorConfig::default());
        let series = CandleSeries::new(make_bars(&[1.0; 20])).unwrap();
        assert_eq!(
            pipeline.evaluate(&series).unwrap_err(),
            ComputationError::InsufficientBars {
                required: 21,
                available: 20
            }
        );
    }

    #[test]
    fn pipeline_buys_a_steady_rally() {
        let eval = Pipeline::from_config(&small_config())
            .evaluate(&rising())
            .unwrap();
        assert_eq!(eval.trade.signal, Signal::Buy);
        assert_eq!(eval.bar.close, 158.0);
        assert!(!eval.low_volume);
    }

    #[test]
    fn low_volume_filter_forces_none() {
        let mut config = small_config();
        config.volume.min_ratio = Some(0.8);
        // 700 vs an average near 900: below 0.8x but above the 0.5x drop line.
        let series = with_volume(rising(), 700.0);
        let eval = Pipeline::from_config(&config).evaluate(&series).unwrap();
        assert_eq!(eval.trade.signal, Signal::None);
        assert!(eval.low_volume);
        assert_eq!(eval.trade.levels, None);
    }

    #[test]
    fn first_buy_is_alerted_and_saved() {
        let (mut cycle, alerts, journal) =
            cycle(small_config(), vec![Ok(rising())], AlertState::default());
        let report = cycle.run(Utc::now()).unwrap();

        assert_eq!(report.decision, GateDecision::Emit(AlertReason::NewSignal));
        assert_eq!(alerts.len(), 1);
        assert_eq!(journal.len(), 1);
        assert_eq!(cycle.store().save_count(), 1);
        assert_eq!(cycle.store().load().unwrap().last_signal, Some(Signal::Buy));
    }

    #[test]
    fn repeated_buy_is_suppressed_without_side_effects() {
        let (mut cycle, alerts, journal) = cycle(
            small_config(),
            vec![Ok(rising())],
            AlertState {
                last_signal: Some(Signal::Buy),
            },
        );
        let report = cycle.run(Utc::now()).unwrap();
        assert_eq!(report.decision, GateDecision::Suppressed);
        assert!(alerts.is_empty());
        assert!(journal.is_empty());
        assert_eq!(cycle.store().save_count(), 0);
    }

    #[test]
    fn volume_spike_overrides_suppression() {
        let (mut cycle, alerts, _) = cycle(
            small_config(),
            vec![Ok(with_volume(rising(), 5_000.0))],
            AlertState {
                last_signal: Some(Signal::Buy),
            },
        );
        let report = cycle.run(Utc::now()).unwrap();
        assert_eq!(report.decision, GateDecision::Emit(AlertReason::VolumeSpike));
        assert_eq!(alerts.len(), 1);
        assert!(alerts.alerts()[0].message.contains("spike"));
        // State already held BUY.
        assert_eq!(cycle.store().save_count(), 0);
    }

    #[test]
    fn reversal_alerts_and_overwrites_state() {
        let (mut cycle, alerts, _) = cycle(
            small_config(),
            vec![Ok(falling())],
            AlertState {
                last_signal: Some(Signal::Buy),
            },
        );
        cycle.run(Utc::now()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(cycle.store().load().unwrap().last_signal, Some(Signal::Sell));
    }

    #[test]
    fn crossover_mode_is_quiet_mid_trend() {
        let mut config = small_config();
        config.indicator.signal_mode = SignalMode::Crossover;
        let (mut cycle, alerts, journal) = cycle(config, vec![Ok(rising())], AlertState::default());
        let report = cycle.run(Utc::now()).unwrap();
        assert_eq!(report.trade.signal, Signal::None);
        assert_eq!(report.decision, GateDecision::Quiet);
        assert!(alerts.is_empty());
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn fetch_error_skips_cycle() {
        let (mut cycle, alerts, journal) = cycle(
            small_config(),
            vec![Err(DataError::Upstream {
                status: 502,
                body: "bad gateway".into(),
            })],
            AlertState::default(),
        );
        let err = cycle.run(Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert!(alerts.is_empty());
        assert!(journal.is_empty());
        assert_eq!(cycle.store().save_count(), 0);
    }

    struct Broken;

    impl AlertSink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn deliver(&self, _alert: &Alert) -> Result<(), SinkError> {
            Err(SinkError::Delivery("endpoint down".into()))
        }
    }

    struct ReadOnlyStore;

    impl StateStore for ReadOnlyStore {
        fn load(&self) -> Result<AlertState, StateError> {
            Ok(AlertState::default())
        }

        fn save(&self, _state: &AlertState) -> Result<(), StateError> {
            Err(StateError::Io {
                path: "state.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn failing_sinks_still_save_state() {
        let mut cycle = CheckCycle::new(
            small_config(),
            Box::new(StaticProvider::scripted(vec![Ok(rising())])),
            MemoryStateStore::new(AlertState::default()),
        )
        .with_notifier(Notifier::new().with_sink(Broken))
        .with_journal(Broken);

        let report = cycle.run(Utc::now()).unwrap();
        assert!(report.decision.is_emit());
        assert_eq!(report.sink_failures, 2);
        assert_eq!(cycle.store().save_count(), 1);
        assert_eq!(cycle.store().load().unwrap().last_signal, Some(Signal::Buy));
    }

    #[test]
    fn save_failure_after_delivery_fails_cycle() {
        let alerts = MemorySink::new();
        let mut cycle = CheckCycle::new(
            small_config(),
            Box::new(StaticProvider::scripted(vec![Ok(rising())])),
            ReadOnlyStore,
        )
        .with_notifier(Notifier::new().with_sink(alerts.clone()));

        let err = cycle.run(Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "state");
        // The alert already went out before the save was attempted.
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn short_series_is_computation_error() {
        let short = CandleSeries::new(make_bars(&[1.0, 2.0])).unwrap();
        let (mut cycle, _, _) = cycle(small_config(), vec![Ok(short)], AlertState::default());
        let err = cycle.run(Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            CycleError::Computation(ComputationError::InsufficientBars { required: 4, available: 2 })
        ));
    }
}

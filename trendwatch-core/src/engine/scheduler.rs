//! Fixed-interval scheduler.
//!
//! Runs one cycle immediately, then one per interval. Deadlines advance from
//! the previous deadline, not from when a cycle finished, so cycles do not
//! drift. A cycle that overruns its slot pushes the next deadline to "now";
//! missed slots are not replayed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use super::cycle::{CycleError, CycleReport};

/// Time source, swappable in tests.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Totals over a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: usize,
    pub emitted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Scheduler<C: Clock = SystemClock> {
    interval: Duration,
    max_cycles: Option<usize>,
    clock: C,
}

impl Scheduler<SystemClock> {
    pub fn new(interval: Duration) -> Self {
        Self::with_clock(interval, SystemClock)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(interval: Duration, clock: C) -> Self {
        assert!(!interval.is_zero(), "scheduler interval must be positive");
        Self {
            interval,
            max_cycles: None,
            clock,
        }
    }

    /// Stop after `n` cycles. Unbounded by default.
    pub fn max_cycles(mut self, n: usize) -> Self {
        self.max_cycles = Some(n);
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Drive `cycle` until `max_cycles` is reached. Errors are logged and the
    /// loop carries on.
    pub fn run<F>(&self, mut cycle: F) -> RunSummary
    where
        F: FnMut(DateTime<Utc>) -> Result<CycleReport, CycleError>,
    {
        let interval = chrono::Duration::from_std(self.interval)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        let mut summary = RunSummary::default();
        let mut deadline = self.clock.now();

        loop {
            let started = self.clock.now();
            match cycle(started) {
                Ok(report) => {
                    if report.decision.is_emit() {
                        summary.emitted += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(kind = e.kind(), error = %e, "check cycle skipped");
                }
            }
            summary.cycles += 1;

            if self.max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }

            let now = self.clock.now();
            deadline = (deadline + interval).max(now);
            if let Ok(wait) = (deadline - now).to_std() {
                if !wait.is_zero() {
                    info!(next = %deadline, "waiting for next check");
                    self.clock.sleep(wait);
                }
            }
        }

        summary
    }
}

//! Alert gate: suppresses repeats of the last alerted directional signal.
//!
//! The gate owns the last alerted signal. It is loaded from the state store at
//! the start of a cycle, consulted once, and written back only if it changed.
//!
//! Decision table, checked top to bottom:
//!
//! | volume        | signal                      | decision               |
//! |---------------|-----------------------------|------------------------|
//! | spike         | any                         | `Emit(VolumeSpike)`    |
//! | drop          | any                         | `Emit(VolumeDrop)`     |
//! | normal        | BUY/SELL equal to last      | `Suppressed`           |
//! | normal        | BUY/SELL different from last| `Emit(NewSignal)`      |
//! | normal        | NONE                        | `Quiet`                |
//!
//! Only an emitted BUY or SELL overwrites the stored signal. NONE never reads
//! or writes it: the gate only guards against repeating the same directional call.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signals::{Signal, VolumeCondition};

/// Persisted record of the last alerted signal.
///
/// `last_signal` is `None` until the first directional alert is emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub last_signal: Option<Signal>,
}

/// Why an alert is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertReason {
    NewSignal,
    VolumeSpike,
    VolumeDrop,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NewSignal => f.write_str("new signal"),
            Self::VolumeSpike => f.write_str("volume spike"),
            Self::VolumeDrop => f.write_str("volume drop"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    /// Deliver an alert.
    Emit(AlertReason),
    /// Same directional call as the last alert, no volume event.
    Suppressed,
    /// No directional call and no volume event: nothing to alert.
    Quiet,
}

impl GateDecision {
    pub fn is_emit(&self) -> bool {
        matches!(self, Self::Emit(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertGate {
    state: AlertState,
}

impl AlertGate {
    pub fn new(state: AlertState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Decide without mutating the gate.
    pub fn decide(&self, signal: Signal, volume: VolumeCondition) -> GateDecision {
        match volume {
            VolumeCondition::Spike => GateDecision::Emit(AlertReason::VolumeSpike),
            VolumeCondition::Drop => GateDecision::Emit(AlertReason::VolumeDrop),
            VolumeCondition::Normal if !signal.is_directional() => GateDecision::Quiet,
            VolumeCondition::Normal if self.state.last_signal == Some(signal) => {
                GateDecision::Suppressed
            }
            VolumeCondition::Normal => GateDecision::Emit(AlertReason::NewSignal),
        }
    }

    /// Decide and apply. Returns the decision and whether the state changed.
    pub fn process(&mut self, signal: Signal, volume: VolumeCondition) -> (GateDecision, bool) {
        let decision = self.decide(signal, volume);
        let changed = decision.is_emit()
            && signal.is_directional()
            && self.state.last_signal != Some(signal);
        if changed {
            self.state.last_signal = Some(signal);
        }
        (decision, changed)
    }
}

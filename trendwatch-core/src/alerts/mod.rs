//! Alert deduplication and its persisted state.

pub mod gate;
pub mod store;

pub use gate::{AlertGate, AlertReason, AlertState, GateDecision};
pub use store::{JsonStateStore, MemoryStateStore, StateError, StateStore};

//! Check cycle and the scheduler that drives it.

pub mod cycle;
pub mod scheduler;

pub use cycle::{CheckCycle, CycleError, CycleReport, Evaluation, Pipeline};
pub use scheduler::{Clock, RunSummary, Scheduler, SystemClock};

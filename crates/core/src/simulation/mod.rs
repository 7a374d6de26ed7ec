//! Calculation passes: orchestration, busy guard, progress and summary

pub mod calculator;
pub mod guard;
pub mod progress;
pub mod summary;

pub use calculator::{DispersionCalculator, DispersionReport};
pub use guard::{CalculationGuard, CancellationToken, PassTimer};
pub use progress::{NoProgress, PassKind, Progress, ProgressSink};
pub use summary::{EmissionSummary, ExposureStatus, SourcePeak};

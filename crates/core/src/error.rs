use thiserror::Error;

/// Failures a calculation pass reports to its caller.
///
/// Out-of-range inputs are not errors: distances outside the valid window,
/// degenerate sigmas and unreachable thresholds all yield zero or an absent
/// polygon. Only conditions the caller must act on end up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispersionError {
    #[error("a calculation pass is already in progress; retry once it finishes")]
    Busy,

    #[error("calculation cancelled after {completed_sources} of {total_sources} sources")]
    Cancelled {
        completed_sources: usize,
        total_sources: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type DispersionResult<T> = Result<T, DispersionError>;

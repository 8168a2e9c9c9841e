//! Scheduling error types.

use thiserror::Error;

/// Errors raised while planning cut points or building a schedule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    /// Cut policy or durations violate the cut point contract.
    #[error("Invalid cut points: {0}")]
    InvalidCutPoints(String),

    /// Scheduler inputs are unusable (no takes, bad durations).
    #[error("Invalid schedule configuration: {0}")]
    InvalidConfig(String),

    /// No take covers a cut point. Adjust `start` or `duration` and retry.
    #[error(
        "No take available at cut point {cut_point_secs:.3}s (segment {duration_secs:.3}s, reference time {reference_time_secs:.3}s)"
    )]
    NoCandidateAvailable {
        cut_point_secs: f64,
        duration_secs: f64,
        reference_time_secs: f64,
    },
}

impl ScheduleError {
    pub fn invalid_cut_points(message: impl Into<String>) -> Self {
        Self::InvalidCutPoints(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type for scheduling operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

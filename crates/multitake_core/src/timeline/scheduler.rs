//! Segment scheduler.
//!
//! Walks the cut points in increasing order. For each one it computes the
//! candidate takes from their availability windows, lets the selection
//! policy pick one, maps the cut point onto that take's local clock and
//! emits a segment. An empty candidate set aborts the whole pass.

use crate::cancel::CancelHandle;
use crate::models::{AlignedTake, Schedule, Segment};

use super::availability::{candidates, query_time};
use super::cut_points::{self, CutPoint, CutPolicy};
use super::errors::{ScheduleError, ScheduleResult};
use super::selection::SelectionPolicy;

/// Scheduler state machine.
///
/// `AwaitingCutPoint → SelectingCandidate → Extracting → AwaitingCutPoint`
/// until the cut points run out (`Done`) or a candidate set is empty
/// (`Failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    AwaitingCutPoint,
    SelectingCandidate,
    Extracting,
    Done,
    Failed,
}

/// Local start time of a segment on the chosen take's clock.
///
/// The offset correction applies only to takes that start before the
/// reference by strictly more than `start_margin`. At exactly the margin the
/// cut point is used as is.
pub fn corrected_local_start(cut_point_secs: f64, start_offset_secs: f64, start_margin: f64) -> f64 {
    if start_offset_secs < 0.0 && -start_offset_secs > start_margin {
        cut_point_secs + start_offset_secs
    } else {
        cut_point_secs
    }
}

/// Builds one `Schedule` per call from aligned takes and cut points.
///
/// Owns the selection policy, so its RNG is never shared between passes
/// running on different schedulers.
pub struct SegmentScheduler {
    policy: Box<dyn SelectionPolicy>,
    cancel: Option<CancelHandle>,
    state: SchedulerState,
}

impl SegmentScheduler {
    pub fn new(policy: Box<dyn SelectionPolicy>) -> Self {
        Self {
            policy,
            cancel: None,
            state: SchedulerState::AwaitingCutPoint,
        }
    }

    /// Stop early when `cancel` fires, returning the partial schedule.
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Plan cut points with `policy` and build the schedule.
    pub fn schedule(
        &mut self,
        takes: &[AlignedTake],
        reference_duration: f64,
        start_secs: f64,
        duration_secs: f64,
        policy: &CutPolicy,
    ) -> ScheduleResult<Schedule> {
        let cut_points = policy.plan(duration_secs)?;
        tracing::debug!(
            "[Schedule] {} policy produced {} cut points",
            policy.name(),
            cut_points.len()
        );
        self.build(takes, reference_duration, start_secs, duration_secs, &cut_points)
    }

    /// Build the schedule for pre-computed cut points.
    pub fn build(
        &mut self,
        takes: &[AlignedTake],
        reference_duration: f64,
        start_secs: f64,
        duration_secs: f64,
        cut_points: &[CutPoint],
    ) -> ScheduleResult<Schedule> {
        self.state = SchedulerState::AwaitingCutPoint;
        validate_inputs(takes, reference_duration, start_secs, duration_secs)?;
        cut_points::validate(cut_points, duration_secs)?;

        let mut segments = Vec::with_capacity(cut_points.len());

        for (cut_index, cut) in cut_points.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                tracing::warn!(
                    "[Schedule] Cancelled at cut point {}/{}, returning {} segments",
                    cut_index,
                    cut_points.len(),
                    segments.len()
                );
                self.state = SchedulerState::Done;
                return Ok(Schedule {
                    start_secs,
                    duration_secs,
                    segments,
                    complete: false,
                });
            }

            self.transition(SchedulerState::SelectingCandidate);
            let available = candidates(
                takes,
                reference_duration,
                start_secs,
                cut.at_secs,
                cut.check_secs,
            );
            if available.is_empty() {
                self.transition(SchedulerState::Failed);
                return Err(ScheduleError::NoCandidateAvailable {
                    cut_point_secs: cut.at_secs,
                    duration_secs: cut.duration_secs,
                    reference_time_secs: query_time(cut.at_secs, start_secs),
                });
            }

            let chosen = self.policy.select(&available, cut_index);
            let take = takes.get(chosen).ok_or_else(|| {
                ScheduleError::invalid_config(format!(
                    "selection policy '{}' returned take {} outside {} takes",
                    self.policy.name(),
                    chosen,
                    takes.len()
                ))
            })?;

            self.transition(SchedulerState::Extracting);
            let local_start = corrected_local_start(cut.at_secs, take.offset.start_secs, start_secs);
            let segment = Segment {
                recording_id: take.id.clone(),
                local_start_frame: take.video.frame_at(local_start),
                frame_count: take.video.frames_for(cut.duration_secs),
                cut_point_secs: cut.at_secs,
                duration_secs: cut.duration_secs,
            };
            tracing::trace!(
                "[Schedule] cut {:.3}s: {} of {} candidates -> {} @ frame {} ({} frames)",
                cut.at_secs,
                chosen,
                available.len(),
                segment.recording_id,
                segment.local_start_frame,
                segment.frame_count
            );
            segments.push(segment);

            self.transition(SchedulerState::AwaitingCutPoint);
        }

        self.transition(SchedulerState::Done);
        tracing::info!(
            "[Schedule] Built {} segments over {:.2}s starting at {:.2}s ({} selection)",
            segments.len(),
            duration_secs,
            start_secs,
            self.policy.name()
        );

        Ok(Schedule {
            start_secs,
            duration_secs,
            segments,
            complete: true,
        })
    }

    fn transition(&mut self, next: SchedulerState) {
        tracing::trace!("[Schedule] {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

fn validate_inputs(
    takes: &[AlignedTake],
    reference_duration: f64,
    start_secs: f64,
    duration_secs: f64,
) -> ScheduleResult<()> {
    if takes.is_empty() {
        return Err(ScheduleError::invalid_config("no takes to schedule"));
    }
    if !reference_duration.is_finite() || reference_duration <= 0.0 {
        return Err(ScheduleError::invalid_config(format!(
            "reference duration must be positive, got {}",
            reference_duration
        )));
    }
    if !start_secs.is_finite() || start_secs < 0.0 {
        return Err(ScheduleError::invalid_config(format!(
            "start must be non-negative, got {}",
            start_secs
        )));
    }
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(ScheduleError::invalid_config(format!(
            "duration must be positive, got {}",
            duration_secs
        )));
    }
    Ok(())
}

//! Schedule step - plans cut points and picks a take for each.

use rand::Rng;

use crate::analysis::beats::to_output_timeline;
use crate::config::CutPolicyKind;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RunState, ScheduleOutput, StepOutcome};
use crate::timeline::{create_policy, CutPolicy, SegmentScheduler};

/// Schedule step driving the segment scheduler.
pub struct ScheduleStep;

impl ScheduleStep {
    pub fn new() -> Self {
        Self
    }

    fn cut_policy(&self, ctx: &Context, state: &RunState) -> StepResult<CutPolicy> {
        let timeline = &ctx.settings.timeline;
        match timeline.cut_policy {
            CutPolicyKind::Fixed => Ok(timeline.fixed_policy()),
            CutPolicyKind::Beats => {
                let beats = state.alignment()?.reference_beats.as_deref().ok_or_else(|| {
                    StepError::precondition_failed("beat policy selected but no beats were loaded")
                })?;
                let output_beats =
                    to_output_timeline(beats, timeline.start_secs, timeline.duration_secs);
                ctx.logger.info(&format!(
                    "{} of {} beats fall inside the output window",
                    output_beats.len(),
                    beats.len()
                ));
                Ok(timeline.beat_policy(output_beats))
            }
        }
    }
}

impl Default for ScheduleStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ScheduleStep {
    fn name(&self) -> &str {
        "Schedule"
    }

    fn description(&self) -> &str {
        "Choose an available take for every cut point"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let timeline = &ctx.settings.timeline;
        if !(timeline.duration_secs > 0.0) {
            return Err(StepError::invalid_input(format!(
                "output duration must be positive, got {}",
                timeline.duration_secs
            )));
        }
        if timeline.start_secs < 0.0 {
            return Err(StepError::invalid_input(format!(
                "start must not be negative, got {}",
                timeline.start_secs
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let timeline = &ctx.settings.timeline;
        let selection = &ctx.settings.selection;

        let takes = state.aligned_takes(&ctx.project, ctx.settings.output.fps)?;
        let reference_duration = state.alignment()?.reference_duration_secs;
        let policy = self.cut_policy(ctx, state)?;

        let seed = selection.seed.unwrap_or_else(|| rand::rng().random());
        let mut scheduler =
            SegmentScheduler::new(create_policy(selection.policy, seed, selection.fixed_index))
                .with_cancel(ctx.cancel.clone());
        ctx.logger.info(&format!(
            "Cut policy '{}', selection '{}', seed {}",
            policy.name(),
            scheduler.policy_name(),
            seed
        ));

        let schedule = scheduler.schedule(
            &takes,
            reference_duration,
            timeline.start_secs,
            timeline.duration_secs,
            &policy,
        )?;

        for segment in &schedule.segments {
            ctx.logger.debug(&format!(
                "{:>8.3}s +{:.3}s  {} from frame {} ({} frames)",
                segment.cut_point_secs,
                segment.duration_secs,
                segment.recording_id,
                segment.local_start_frame,
                segment.frame_count
            ));
        }
        ctx.logger.info(&format!(
            "{} segments, {} frames{}",
            schedule.len(),
            schedule.total_frames(),
            if schedule.complete { "" } else { " (partial)" }
        ));

        state.record_schedule(ScheduleOutput {
            cut_policy: policy.name().to_string(),
            selection: scheduler.policy_name().to_string(),
            seed,
            schedule,
        })?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let schedule = &state.schedule()?.schedule;
        if schedule.complete && (schedule.covered_secs() - schedule.duration_secs).abs() > 1e-6 {
            return Err(StepError::invalid_output(format!(
                "segments cover {:.6}s of {:.6}s",
                schedule.covered_secs(),
                schedule.duration_secs
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::OffsetEstimate;
    use crate::models::{Offset, RecordingId, VideoInfo};
    use crate::orchestrator::types::{test_support, AlignOutput, ProbeOutput};
    use crate::timeline::{ScheduleError, SelectionStrategy};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    const REFERENCE_SECS: f64 = 120.0;

    fn estimate(id: &str, start_secs: f64, take_secs: f64) -> OffsetEstimate {
        OffsetEstimate {
            recording_id: RecordingId::new(id),
            start_offset_samples: (start_secs * 8000.0) as i64,
            end_offset_samples: 0,
            sample_rate: 8000,
            offset: Offset::from_start(start_secs, take_secs, REFERENCE_SECS),
            confidence: 0.9,
        }
    }

    /// take_a lines up with the reference, take_b starts 5s into it and runs 115s.
    fn aligned_state(beats: Option<Vec<f64>>) -> RunState {
        let video = VideoInfo {
            duration_secs: 120.0,
            fps: 25.0,
            width: 1920,
            height: 1080,
        };
        let mut state = RunState::new("run");
        state
            .record_probe(ProbeOutput {
                reference_duration_secs: REFERENCE_SECS,
                takes: [
                    (RecordingId::new("take_a"), video),
                    (RecordingId::new("take_b"), video),
                ]
                .into_iter()
                .collect(),
            })
            .unwrap();
        let estimates: BTreeMap<_, _> = [
            (RecordingId::new("take_a"), estimate("take_a", 0.0, 120.0)),
            (RecordingId::new("take_b"), estimate("take_b", -5.0, 115.0)),
        ]
        .into_iter()
        .collect();
        state
            .record_alignment(AlignOutput {
                reference_duration_secs: REFERENCE_SECS,
                sample_rate: 8000,
                estimates,
                reference_beats: beats,
            })
            .unwrap();
        state
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.settings.selection.seed = Some(7);
        ctx.settings.timeline.start_secs = 20.0;
        ctx.settings.timeline.duration_secs = 30.0;
        ctx.settings.timeline.step_secs = 5.0;

        let mut first = aligned_state(None);
        let mut second = aligned_state(None);
        ScheduleStep::new().execute(&ctx, &mut first).unwrap();
        ScheduleStep::new().execute(&ctx, &mut second).unwrap();

        let a = first.schedule().unwrap();
        let b = second.schedule().unwrap();
        assert_eq!(a.seed, 7);
        assert_eq!(
            a.schedule.to_json().unwrap(),
            b.schedule.to_json().unwrap()
        );
        assert_eq!(a.schedule.len(), 6);
        assert!(a.schedule.complete);
        assert!(ScheduleStep::new().validate_output(&ctx, &first).is_ok());
    }

    #[test]
    fn frames_are_counted_at_output_rate() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.settings.selection.policy = SelectionStrategy::Fixed;
        ctx.settings.timeline.start_secs = 0.0;
        ctx.settings.timeline.duration_secs = 10.0;
        ctx.settings.timeline.step_secs = 10.0;
        ctx.settings.output.fps = 30.0;

        let mut state = aligned_state(None);
        ScheduleStep::new().execute(&ctx, &mut state).unwrap();

        let segment = &state.schedule().unwrap().schedule.segments[0];
        assert_eq!(segment.recording_id.as_str(), "take_a");
        assert_eq!(segment.frame_count, 300);
    }

    #[test]
    fn uncovered_window_fails_with_no_candidate() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.settings.selection.seed = Some(1);
        ctx.settings.timeline.start_secs = 130.0;
        ctx.settings.timeline.duration_secs = 10.0;

        let mut state = aligned_state(None);
        let err = ScheduleStep::new().execute(&ctx, &mut state).unwrap_err();
        assert!(matches!(
            err,
            StepError::Schedule(ScheduleError::NoCandidateAvailable { .. })
        ));
        assert!(state.schedule.is_none());
    }

    #[test]
    fn beat_policy_cuts_on_shifted_beats() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.settings.selection.seed = Some(3);
        ctx.settings.timeline.cut_policy = CutPolicyKind::Beats;
        ctx.settings.timeline.start_secs = 30.0;
        ctx.settings.timeline.duration_secs = 10.0;

        let mut state = aligned_state(Some(vec![10.0, 30.0, 32.5, 36.0, 50.0]));
        ScheduleStep::new().execute(&ctx, &mut state).unwrap();

        let output = state.schedule().unwrap();
        assert_eq!(output.cut_policy, "beats");
        let cuts: Vec<f64> = output
            .schedule
            .segments
            .iter()
            .map(|s| s.cut_point_secs)
            .collect();
        assert_eq!(cuts, vec![0.0, 2.5, 6.0]);
    }

    #[test]
    fn beat_policy_without_beats_is_a_precondition_failure() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.settings.timeline.cut_policy = CutPolicyKind::Beats;

        let mut state = aligned_state(None);
        assert!(matches!(
            ScheduleStep::new().execute(&ctx, &mut state),
            Err(StepError::PreconditionFailed(_))
        ));
    }
}

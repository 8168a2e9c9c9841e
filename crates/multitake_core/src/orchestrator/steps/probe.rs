//! Probe step - reads durations and video stream properties.
//!
//! Fails fast: a reference or take that ffprobe cannot read stops the run
//! before any audio is decoded.

use std::collections::BTreeMap;

use crate::analysis::AnalysisError;
use crate::media::{probe_duration, probe_video};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, ProbeOutput, RunState, StepOutcome};

/// Probe step for the reference track and every take.
pub struct ProbeStep;

impl ProbeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProbeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ProbeStep {
    fn name(&self) -> &str {
        "Probe"
    }

    fn description(&self) -> &str {
        "Read reference duration and take video properties"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        ctx.project.validate().map_err(StepError::invalid_input)?;

        if !ctx.project.reference.exists() {
            return Err(StepError::file_not_found(
                ctx.project.reference.display().to_string(),
            ));
        }
        for take in &ctx.project.takes {
            if !take.path.exists() {
                return Err(StepError::file_not_found(format!(
                    "{}: {}",
                    take.id,
                    take.path.display()
                )));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let probe_config = &ctx.settings.probe;
        let reference = &ctx.project.reference;

        let reference_duration = probe_duration(reference, probe_config)
            .map_err(|e| AnalysisError::decode(reference.display().to_string(), e.to_string()))?;
        ctx.logger.info(&format!(
            "Reference {}: {:.3}s",
            reference.display(),
            reference_duration
        ));

        let timeline = &ctx.settings.timeline;
        if timeline.start_secs + timeline.duration_secs > reference_duration {
            ctx.logger.warn(&format!(
                "Output window {:.3}s..{:.3}s runs past the reference end ({:.3}s)",
                timeline.start_secs,
                timeline.start_secs + timeline.duration_secs,
                reference_duration
            ));
        }

        let total = ctx.project.takes.len();
        let mut takes = BTreeMap::new();
        for (i, take) in ctx.project.takes.iter().enumerate() {
            let info = probe_video(&take.path, probe_config)
                .map_err(|e| AnalysisError::decode(take.id.as_str(), e.to_string()))?;
            ctx.logger.info(&format!(
                "{}: {}x{} @ {:.3} fps, {:.3}s",
                take.id, info.width, info.height, info.fps, info.duration_secs
            ));
            takes.insert(take.id.clone(), info);
            ctx.logger.progress_of(i + 1, total);
        }

        state.record_probe(ProbeOutput {
            reference_duration_secs: reference_duration,
            takes,
        })?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let probe = state.probe()?;
        if !(probe.reference_duration_secs > 0.0) {
            return Err(StepError::invalid_output(format!(
                "reference duration {} is not positive",
                probe.reference_duration_secs
            )));
        }
        if probe.takes.len() != ctx.project.takes.len() {
            return Err(StepError::invalid_output(format!(
                "probed {} of {} takes",
                probe.takes.len(),
                ctx.project.takes.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordingId, VideoInfo};
    use crate::orchestrator::types::test_support;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_reference_fails_validation() {
        let dir = tempdir().unwrap();
        let ctx = test_support::context(dir.path());

        let err = ProbeStep::new().validate_input(&ctx).unwrap_err();
        assert!(matches!(err, StepError::FileNotFound { .. }));
        assert!(err.to_string().contains("reference.wav"));
    }

    #[test]
    fn missing_take_fails_validation() {
        let dir = tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        fs::write(dir.path().join("reference.wav"), b"").unwrap();
        fs::write(dir.path().join("take_a.mp4"), b"").unwrap();

        let err = ProbeStep::new().validate_input(&ctx).unwrap_err();
        assert!(err.to_string().contains("take_b"));
    }

    #[test]
    fn output_must_cover_every_take() {
        let dir = tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let mut state = RunState::new("run");
        state
            .record_probe(ProbeOutput {
                reference_duration_secs: 90.0,
                takes: [(
                    RecordingId::new("take_a"),
                    VideoInfo {
                        duration_secs: 80.0,
                        fps: 30.0,
                        width: 1920,
                        height: 1080,
                    },
                )]
                .into_iter()
                .collect(),
            })
            .unwrap();

        assert!(ProbeStep::new().validate_output(&ctx, &state).is_err());
    }
}

//! Core types for the orchestrator pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::analysis::OffsetEstimate;
use crate::cancel::CancelHandle;
use crate::config::Settings;
use crate::logging::RunLogger;
use crate::media::FfmpegOptions;
use crate::models::{AlignedTake, ProjectSpec, RecordingId, Schedule, VideoInfo};
use crate::render::RenderReport;

use super::errors::{StepError, StepResult};

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Mutable results go in `RunState`.
pub struct Context {
    /// Reference track and takes.
    pub project: ProjectSpec,
    pub settings: Settings,
    /// Run name used in logs, errors and output file names.
    pub run_name: String,
    /// Per-run working directory (under temp_root).
    pub work_dir: PathBuf,
    /// Directory for the rendered video and schedule sidecar.
    pub output_dir: PathBuf,
    pub logger: Arc<RunLogger>,
    /// Checked by the pipeline between steps and by long-running steps.
    pub cancel: CancelHandle,
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        project: ProjectSpec,
        settings: Settings,
        work_dir: PathBuf,
        output_dir: PathBuf,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            run_name: project.name.clone(),
            project,
            settings,
            work_dir,
            output_dir,
            logger,
            cancel: CancelHandle::new(),
            progress_callback: None,
        }
    }

    /// Share an existing cancellation handle (e.g. one wired to Ctrl-C).
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// ffmpeg command settings from the output section.
    pub fn ffmpeg_options(&self) -> FfmpegOptions {
        FfmpegOptions {
            program: self.settings.output.ffmpeg.clone(),
            force: true,
            video_codec: self.settings.output.codec.clone(),
        }
    }

    /// Per-command timeout, `None` when disabled.
    pub fn command_timeout(&self) -> Option<Duration> {
        let secs = self.settings.output.command_timeout_secs;
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

/// Results accumulated by pipeline steps.
///
/// Write-once: each step fills its own section and a second write is
/// rejected. After a failure or cancellation the sections already filled
/// stay readable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderOutput>,
}

impl RunState {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    pub fn record_probe(&mut self, output: ProbeOutput) -> StepResult<()> {
        record(&mut self.probe, output, "probe")
    }

    pub fn record_alignment(&mut self, output: AlignOutput) -> StepResult<()> {
        record(&mut self.alignment, output, "alignment")
    }

    pub fn record_schedule(&mut self, output: ScheduleOutput) -> StepResult<()> {
        record(&mut self.schedule, output, "schedule")
    }

    pub fn record_render(&mut self, output: RenderOutput) -> StepResult<()> {
        record(&mut self.render, output, "render")
    }

    pub fn probe(&self) -> StepResult<&ProbeOutput> {
        self.probe
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("media has not been probed"))
    }

    pub fn alignment(&self) -> StepResult<&AlignOutput> {
        self.alignment
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("takes have not been aligned"))
    }

    pub fn schedule(&self) -> StepResult<&ScheduleOutput> {
        self.schedule
            .as_ref()
            .ok_or_else(|| StepError::precondition_failed("no schedule has been built"))
    }

    /// Aligned takes in project order, on a clock running at `fps`.
    ///
    /// Takes are pre-trimmed at the output rate before rendering, so
    /// frame indices are computed at `fps` rather than the source rate.
    pub fn aligned_takes(&self, project: &ProjectSpec, fps: f64) -> StepResult<Vec<AlignedTake>> {
        let probe = self.probe()?;
        let alignment = self.alignment()?;

        project
            .takes
            .iter()
            .map(|take| {
                let video = probe.takes.get(&take.id).ok_or_else(|| {
                    StepError::precondition_failed(format!("take '{}' was not probed", take.id))
                })?;
                let estimate = alignment.estimates.get(&take.id).ok_or_else(|| {
                    StepError::precondition_failed(format!("take '{}' was not aligned", take.id))
                })?;
                Ok(AlignedTake::new(
                    take.id.clone(),
                    estimate.offset,
                    VideoInfo { fps, ..*video },
                ))
            })
            .collect()
    }
}

fn record<T>(slot: &mut Option<T>, value: T, what: &str) -> StepResult<()> {
    if slot.is_some() {
        return Err(StepError::precondition_failed(format!(
            "{} output already recorded",
            what
        )));
    }
    *slot = Some(value);
    Ok(())
}

/// Output from the Probe step.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutput {
    /// Container duration of the reference track.
    pub reference_duration_secs: f64,
    /// First video stream of each take.
    pub takes: BTreeMap<RecordingId, VideoInfo>,
}

/// Output from the Align step.
#[derive(Debug, Clone, Serialize)]
pub struct AlignOutput {
    /// Duration of the decoded reference audio; availability is judged against it.
    pub reference_duration_secs: f64,
    pub sample_rate: u32,
    pub estimates: BTreeMap<RecordingId, OffsetEstimate>,
    /// Beat instants on the reference clock, when the beat policy is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_beats: Option<Vec<f64>>,
}

/// Output from the Schedule step.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutput {
    pub schedule: Schedule,
    pub cut_policy: String,
    pub selection: String,
    /// Seed the selection policy ran with; pass it back to reproduce the run.
    pub seed: u64,
}

/// Output from the Render step.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutput {
    /// Final muxed video, absent when rendering was cancelled.
    pub output_path: Option<PathBuf>,
    pub schedule_path: Option<PathBuf>,
    pub report: RenderReport,
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Nothing to do (not an error).
    Skipped(String),
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Offset;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn video(fps: f64) -> VideoInfo {
        VideoInfo {
            duration_secs: 60.0,
            fps,
            width: 1920,
            height: 1080,
        }
    }

    fn estimate(id: &str, start_secs: f64) -> OffsetEstimate {
        OffsetEstimate {
            recording_id: RecordingId::new(id),
            start_offset_samples: (start_secs * 8000.0) as i64,
            end_offset_samples: 0,
            sample_rate: 8000,
            offset: Offset::new(start_secs, 0.0),
            confidence: 0.9,
        }
    }

    #[test]
    fn state_sections_are_write_once() {
        let mut state = RunState::new("run-1");
        assert!(state.started_at.is_some());

        let probe = ProbeOutput {
            reference_duration_secs: 60.0,
            takes: BTreeMap::new(),
        };
        state.record_probe(probe.clone()).unwrap();
        assert!(matches!(
            state.record_probe(probe),
            Err(StepError::PreconditionFailed(_))
        ));
        assert!(state.alignment().is_err());
    }

    #[test]
    fn aligned_takes_follow_project_order_at_output_rate() {
        let dir = tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let mut state = RunState::new("run");

        state
            .record_probe(ProbeOutput {
                reference_duration_secs: 60.0,
                takes: [
                    (RecordingId::new("take_a"), video(29.97)),
                    (RecordingId::new("take_b"), video(60.0)),
                ]
                .into_iter()
                .collect(),
            })
            .unwrap();
        state
            .record_alignment(AlignOutput {
                reference_duration_secs: 60.0,
                sample_rate: 8000,
                estimates: [
                    (RecordingId::new("take_b"), estimate("take_b", -2.0)),
                    (RecordingId::new("take_a"), estimate("take_a", 0.5)),
                ]
                .into_iter()
                .collect(),
                reference_beats: None,
            })
            .unwrap();

        let takes = state.aligned_takes(&ctx.project, 30.0).unwrap();
        assert_eq!(takes.len(), 2);
        assert_eq!(takes[0].id.as_str(), "take_a");
        assert_eq!(takes[0].offset.start_secs, 0.5);
        assert!(takes.iter().all(|t| t.video.fps == 30.0));
        assert_eq!(takes[1].video.width, 1920);
    }

    #[test]
    fn aligned_takes_require_every_take() {
        let dir = tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let mut state = RunState::new("run");
        state
            .record_probe(ProbeOutput {
                reference_duration_secs: 60.0,
                takes: [(RecordingId::new("take_a"), video(30.0))].into_iter().collect(),
            })
            .unwrap();
        state
            .record_alignment(AlignOutput {
                reference_duration_secs: 60.0,
                sample_rate: 8000,
                estimates: BTreeMap::new(),
                reference_beats: None,
            })
            .unwrap();

        assert!(state.aligned_takes(&ctx.project, 30.0).is_err());
    }

    #[test]
    fn progress_reaches_callback() {
        let dir = tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ctx = test_support::context(dir.path()).with_progress_callback(Box::new(
            move |step, percent, _| sink.lock().unwrap().push((step.to_string(), percent)),
        ));

        ctx.report_progress("Align", 25, "Starting Align");
        assert_eq!(*seen.lock().unwrap(), vec![("Align".to_string(), 25)]);
    }

    #[test]
    fn command_timeout_zero_disables() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        assert_eq!(ctx.command_timeout(), Some(Duration::from_secs(600)));
        ctx.settings.output.command_timeout_secs = 0;
        assert_eq!(ctx.command_timeout(), None);
    }
}

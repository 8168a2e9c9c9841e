//! Render step - turns the schedule into the final video.
//!
//! 1. Pre-trim every scheduled take and the reference audio (parallel ffmpeg jobs)
//! 2. Pull frames per segment, fit them to the output size, encode
//! 3. Mux the encoded video with the trimmed reference audio
//! 4. Write the schedule sidecar and clean the work directory

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use crate::media::{run_with_timeout, BatchExecutor, MediaCommand, MediaError};
use crate::models::{RecordingId, Schedule, VideoInfo};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, RenderOutput, RunState, StepOutcome};
use crate::render::{FfmpegEncoder, FfmpegFrameReader, FrameSource, Renderer};

const TRIMMED_AUDIO: &str = "reference.wav";
const ENCODED_VIDEO: &str = "video.mp4";

/// Render step producing `<output_dir>/<run_name>.mp4`.
pub struct RenderStep;

impl RenderStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RenderStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-trim jobs for the takes a schedule uses, plus the reference audio.
///
/// Returns the commands and the trimmed file for each take.
pub fn pretrim_commands(
    ctx: &Context,
    state: &RunState,
    schedule: &Schedule,
) -> StepResult<(Vec<MediaCommand>, BTreeMap<RecordingId, PathBuf>)> {
    let ffmpeg = ctx.ffmpeg_options();
    let alignment = state.alignment()?;
    let fps = ctx.settings.output.fps;

    let mut commands = Vec::new();
    let mut trimmed = BTreeMap::new();
    for segment in &schedule.segments {
        let id = &segment.recording_id;
        if trimmed.contains_key(id) {
            continue;
        }
        let source = ctx.project.take_path(id).ok_or_else(|| {
            StepError::precondition_failed(format!("take '{}' is not part of the project", id))
        })?;
        let estimate = alignment.estimates.get(id).ok_or_else(|| {
            StepError::precondition_failed(format!("take '{}' was not aligned", id))
        })?;

        let output = ctx.work_dir.join(format!("{}.mp4", id));
        commands.push(ffmpeg.cut_video(
            source,
            &output,
            estimate.offset.start_secs,
            schedule.start_secs,
            schedule.duration_secs,
            fps,
        ));
        trimmed.insert(id.clone(), output);
    }

    commands.push(ffmpeg.cut_audio(
        &ctx.project.reference,
        &ctx.work_dir.join(TRIMMED_AUDIO),
        schedule.start_secs,
        schedule.duration_secs,
    ));
    Ok((commands, trimmed))
}

impl PipelineStep for RenderStep {
    fn name(&self) -> &str {
        "Render"
    }

    fn description(&self) -> &str {
        "Encode the scheduled segments and mux the reference audio"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let output = &ctx.settings.output;
        if output.width == 0 || output.height == 0 || !(output.fps > 0.0) {
            return Err(StepError::invalid_input(format!(
                "output {}x{} @ {} fps",
                output.width, output.height, output.fps
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let schedule = state.schedule()?.schedule.clone();
        if schedule.is_empty() {
            return Ok(StepOutcome::Skipped("schedule has no segments".to_string()));
        }
        let output = &ctx.settings.output;
        let timeout = ctx.command_timeout();

        fs::create_dir_all(&ctx.work_dir)
            .map_err(|e| StepError::io_error("creating work directory", e))?;
        fs::create_dir_all(&ctx.output_dir)
            .map_err(|e| StepError::io_error("creating output directory", e))?;

        // Pre-trim
        ctx.logger.section("Pre-trimming takes");
        let (commands, trimmed) = pretrim_commands(ctx, state, &schedule)?;
        for command in &commands {
            ctx.logger.command(&command.to_string());
        }
        let workers = if output.workers == 0 {
            BatchExecutor::default().workers()
        } else {
            output.workers
        };
        let mut executor = BatchExecutor::new(workers).with_cancel(ctx.cancel.clone());
        if let Some(timeout) = timeout {
            executor = executor.with_timeout(timeout);
        }
        match executor.run_all(&commands) {
            Ok(_) => {}
            Err(MediaError::Cancelled) => {
                return Ok(StepOutcome::Skipped("cancelled while pre-trimming".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        // Render
        ctx.logger.section("Rendering segments");
        let probe = state.probe()?;
        let mut sources: HashMap<RecordingId, Box<dyn FrameSource>> = HashMap::new();
        for (id, path) in &trimmed {
            let source_info = probe.takes.get(id).ok_or_else(|| {
                StepError::precondition_failed(format!("take '{}' was not probed", id))
            })?;
            let info = VideoInfo {
                duration_secs: schedule.duration_secs,
                fps: output.fps,
                ..*source_info
            };
            sources.insert(
                id.clone(),
                Box::new(FfmpegFrameReader::open(&output.ffmpeg, path, info)?),
            );
        }

        let video_path = ctx.work_dir.join(ENCODED_VIDEO);
        let mut encoder = FfmpegEncoder::spawn(
            &output.ffmpeg,
            &output.codec,
            &video_path,
            output.width,
            output.height,
            output.fps,
        )?;
        let report = Renderer::new(output.width, output.height).render(
            &schedule,
            &mut sources,
            &mut encoder,
            Some(&ctx.cancel),
        )?;
        drop(sources);
        drop(encoder);

        for underrun in &report.underruns {
            ctx.logger.warn(&underrun.to_string());
        }
        ctx.logger.info(&format!(
            "Rendered {} frames in {} segments",
            report.frames_written, report.segments_rendered
        ));

        if report.cancelled {
            state.record_render(RenderOutput {
                output_path: None,
                schedule_path: None,
                report,
            })?;
            return Ok(StepOutcome::Success);
        }

        // Mux
        let output_path = ctx.output_dir.join(format!("{}.mp4", ctx.run_name));
        let mux = ctx.ffmpeg_options().mux(
            &video_path,
            &ctx.work_dir.join(TRIMMED_AUDIO),
            &output_path,
        );
        ctx.logger.command(&mux.to_string());
        let mux_output = run_with_timeout(&mux, timeout)?;
        for line in mux_output.stderr.lines() {
            ctx.logger.output_line(line, true);
        }

        let schedule_path = if output.write_schedule {
            let path = output_path.with_extension("schedule.json");
            let json = schedule
                .to_json()
                .map_err(|e| StepError::parse_error("schedule", e.to_string()))?;
            fs::write(&path, json).map_err(|e| StepError::io_error("writing schedule", e))?;
            Some(path)
        } else {
            None
        };

        if !output.keep_temp {
            if let Err(e) = fs::remove_dir_all(&ctx.work_dir) {
                ctx.logger.warn(&format!(
                    "Could not remove {}: {}",
                    ctx.work_dir.display(),
                    e
                ));
            }
        }

        ctx.logger.success(&format!("Wrote {}", output_path.display()));
        state.record_render(RenderOutput {
            output_path: Some(output_path),
            schedule_path,
            report,
        })?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
        let render = state
            .render
            .as_ref()
            .ok_or_else(|| StepError::invalid_output("render output not recorded"))?;
        match &render.output_path {
            Some(path) if !path.exists() => Err(StepError::invalid_output(format!(
                "{} was not created",
                path.display()
            ))),
            None if !render.report.cancelled => {
                Err(StepError::invalid_output("no output path recorded"))
            }
            _ => Ok(()),
        }
    }
}

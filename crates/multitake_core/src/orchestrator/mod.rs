//! Pipeline orchestrator for one auto-cut run.
//!
//! # Architecture
//!
//! ```text
//! Pipeline
//!     ├── Step: Probe     (durations, video stream properties)
//!     ├── Step: Align     (offsets, reference beats)
//!     ├── Step: Schedule  (cut points, take selection)
//!     └── Step: Render    (pre-trim, frame pull, encode, mux)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use multitake_core::orchestrator::{create_standard_pipeline, Context, RunState};
//!
//! let pipeline = create_standard_pipeline();
//! let ctx = Context::new(project, settings, work_dir, output_dir, logger);
//! let mut state = RunState::new("session-1");
//!
//! let result = pipeline.run(&ctx, &mut state)?;
//! println!("Completed: {:?}", result.steps_completed);
//! ```

mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use steps::{AlignStep, ProbeStep, RenderStep, ScheduleStep};
pub use types::{
    AlignOutput, Context, ProbeOutput, ProgressCallback, RenderOutput, RunState, ScheduleOutput,
    StepOutcome,
};

/// Probe, align, schedule and render.
pub fn create_standard_pipeline() -> Pipeline {
    create_planning_pipeline().with_step(RenderStep::new())
}

/// Everything up to the schedule, without touching any output files.
///
/// Used by `--dry-run`.
pub fn create_planning_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(ProbeStep::new())
        .with_step(AlignStep::new())
        .with_step(ScheduleStep::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_order() {
        assert_eq!(
            create_standard_pipeline().step_names(),
            vec!["Probe", "Align", "Schedule", "Render"]
        );
        assert_eq!(create_planning_pipeline().step_count(), 3);
    }
}

//! Pipeline step trait definition.

use super::errors::StepResult;
use super::types::{Context, RunState, StepOutcome};

/// Trait for pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work and record it in `RunState`
/// 3. `validate_output` - Verify the step produced valid output
///
/// # Example
///
/// ```ignore
/// struct ProbeStep;
///
/// impl PipelineStep for ProbeStep {
///     fn name(&self) -> &str { "Probe" }
///
///     fn validate_input(&self, ctx: &Context) -> StepResult<()> {
///         if !ctx.project.reference.exists() {
///             return Err(StepError::file_not_found(ctx.project.reference.display().to_string()));
///         }
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
///         state.record_probe(ProbeOutput { ... })?;
///         Ok(StepOutcome::Success)
///     }
///
///     fn validate_output(&self, _ctx: &Context, state: &RunState) -> StepResult<()> {
///         state.probe()?;
///         Ok(())
///     }
/// }
/// ```
pub trait PipelineStep: Send + Sync {
    /// Step name for logging and error context.
    fn name(&self) -> &str;

    /// Check that required inputs exist before running.
    fn validate_input(&self, ctx: &Context) -> StepResult<()>;

    /// Perform the step's work and record results in `state`.
    ///
    /// Returns `StepOutcome::Skipped` when there is nothing to do (not an error).
    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome>;

    /// Called after `execute` returns `Success`.
    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()>;

    /// Human-readable description of what this step does.
    fn description(&self) -> &str {
        self.name()
    }
}

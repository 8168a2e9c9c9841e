//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Step → Operation → Detail

use std::io;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::media::MediaError;
use crate::render::RenderError;
use crate::timeline::ScheduleError;

/// Top-level pipeline error with run context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Run '{run_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        run_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Input validation failed before the pipeline started.
    #[error("Run '{run_name}' failed validation: {message}")]
    ValidationFailed { run_name: String, message: String },

    /// Failed to set up the run (create directories, logger, etc.).
    #[error("Run '{run_name}' setup failed: {message}")]
    SetupFailed { run_name: String, message: String },
}

impl PipelineError {
    pub fn step_failed(
        run_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            run_name: run_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn validation_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }

    pub fn setup_failed(run_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            run_name: run_name.into(),
            message: message.into(),
        }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// Decoding or alignment failed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Cut planning or take selection failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// An external tool failed.
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Frame reading, fitting or encoding failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// Parsing or serialization error.
    #[error("Failed to parse {what}: {message}")]
    ParseError { what: String, message: String },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn parse_error(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            what: what.into(),
            message: message.into(),
        }
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn pipeline_error_chains_context() {
        let step_err = StepError::file_not_found("/takes/take_01.mp4");
        let pipeline_err = PipelineError::step_failed("session", "Probe", step_err);

        let msg = pipeline_err.to_string();
        assert!(msg.contains("session"));
        assert!(msg.contains("Probe"));
        assert!(msg.contains("take_01.mp4"));
        assert!(pipeline_err.source().is_some());
    }

    #[test]
    fn domain_errors_convert_transparently() {
        let err: StepError = AnalysisError::ambiguous("take_02", "take audio is silent").into();
        assert!(matches!(err, StepError::Analysis(_)));
        assert!(err.to_string().contains("take audio is silent"));

        let err: StepError = ScheduleError::invalid_config("no takes").into();
        assert!(matches!(err, StepError::Schedule(_)));
    }
}

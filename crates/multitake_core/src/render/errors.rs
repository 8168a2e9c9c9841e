//! Render error types.

use thiserror::Error;

use crate::media::MediaError;
use crate::models::RecordingId;

/// Errors raised while rendering a schedule.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Schedule references a take with no frame source.
    #[error("No frame source for recording '{0}'")]
    MissingSource(RecordingId),

    /// Frame source failed (not an underrun).
    #[error("Frame source '{recording}' failed: {message}")]
    Source {
        recording: String,
        message: String,
    },

    /// Frame does not match the sink's dimensions.
    #[error("Frame size {actual_width}x{actual_height} does not match output {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Sink failed to accept or finalize output.
    #[error("Output failed: {0}")]
    Sink(String),

    /// Invalid output configuration.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// Media tool error.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn source_failed(recording: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            recording: recording.into(),
            message: message.into(),
        }
    }

    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

//! Media tool error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while running ffmpeg/ffprobe.
#[derive(Error, Debug)]
pub enum MediaError {
    /// Tool could not be started.
    #[error("Failed to start {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Tool exited with a non-zero status.
    #[error("{program} failed with exit code {exit_code}: {message}")]
    ToolFailed {
        program: String,
        exit_code: i32,
        message: String,
    },

    /// Tool did not finish in time and was killed.
    #[error("{program} timed out after {timeout_secs}s")]
    Timeout { program: String, timeout_secs: u64 },

    /// Probe kept failing after all retries.
    #[error("Probe of '{path}' failed after {attempts} attempts: {last_error}")]
    ProbeExhausted {
        path: PathBuf,
        attempts: u32,
        last_error: String,
    },

    /// Tool output could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input file missing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Run was cancelled before the command started.
    #[error("Cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn tool_failed(program: impl Into<String>, exit_code: i32, stderr: &str) -> Self {
        Self::ToolFailed {
            program: program.into(),
            exit_code,
            message: last_meaningful_line(stderr),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}

/// Last non-empty stderr line, which is where ffmpeg puts the actual error.
fn last_meaningful_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failed_keeps_last_stderr_line() {
        let err = MediaError::tool_failed("ffmpeg", 1, "header\nInvalid data found\n\n");
        assert_eq!(
            err.to_string(),
            "ffmpeg failed with exit code 1: Invalid data found"
        );
        let empty = MediaError::tool_failed("ffprobe", 2, "");
        assert!(empty.to_string().ends_with("unknown error"));
    }
}

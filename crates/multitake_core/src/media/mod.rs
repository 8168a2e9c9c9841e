//! External media tools (ffmpeg / ffprobe).
//!
//! Everything that spawns a process lives here. Commands are built as plain
//! values (`commands`), run under a deadline (`process`), optionally in
//! parallel (`batch`). Probing and audio decoding sit on top of that.

pub mod audio;
pub mod batch;
pub mod commands;
mod errors;
pub mod probe;
pub mod process;

pub use audio::{extract_audio, DEFAULT_ANALYSIS_SAMPLE_RATE};
pub use batch::{BatchExecutor, CommandOutcome};
pub use commands::{take_cut_start, FfmpegOptions, MediaCommand};
pub use errors::{MediaError, MediaResult};
pub use probe::{probe_duration, probe_video, ProbeConfig};
pub use process::{run_with_timeout, ProcessOutput};

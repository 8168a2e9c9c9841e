//! ffmpeg invocations as plain values.
//!
//! Builders here never touch the filesystem or spawn anything; the batch
//! executor and the pipeline steps decide when to run them.

use std::fmt;
use std::path::{Path, PathBuf};

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub program: String,
    pub args: Vec<String>,
    /// File the command produces, if any.
    pub output: Option<PathBuf>,
}

impl MediaCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    fn with_output(mut self, output: &Path) -> Self {
        self.output = Some(output.to_path_buf());
        self.path_arg(output)
    }

    /// Build a `std::process::Command` for this invocation.
    pub fn to_command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Shared settings for ffmpeg command builders.
#[derive(Debug, Clone)]
pub struct FfmpegOptions {
    /// ffmpeg executable.
    pub program: String,
    /// Overwrite existing outputs (`-y`) instead of refusing (`-n`).
    pub force: bool,
    /// Video codec for re-encoded takes and the final output.
    pub video_codec: String,
}

impl Default for FfmpegOptions {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            force: true,
            video_codec: "libx264".to_string(),
        }
    }
}

impl FfmpegOptions {
    fn base(&self) -> MediaCommand {
        MediaCommand::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error"])
            .arg(if self.force { "-y" } else { "-n" })
    }

    /// Trim `[start, start + duration)` of the reference audio.
    pub fn cut_audio(&self, input: &Path, output: &Path, start: f64, duration: f64) -> MediaCommand {
        self.base()
            .arg("-ss")
            .arg(format_secs(start.max(0.0)))
            .arg("-i")
            .path_arg(input)
            .arg("-t")
            .arg(format_secs(duration))
            .arg("-vn")
            .with_output(output)
    }

    /// Pre-trim a take so its local clock starts at `max(0, start_offset + start)`.
    ///
    /// Audio is dropped and the frame rate normalized to the output rate so
    /// frame indices from the schedule address the trimmed file directly.
    pub fn cut_video(
        &self,
        input: &Path,
        output: &Path,
        start_offset: f64,
        start: f64,
        duration: f64,
        fps: f64,
    ) -> MediaCommand {
        self.base()
            .arg("-ss")
            .arg(format_secs(take_cut_start(start_offset, start)))
            .arg("-i")
            .path_arg(input)
            .arg("-t")
            .arg(format_secs(duration))
            .arg("-an")
            .arg("-c:v")
            .arg(self.video_codec.clone())
            .arg("-r")
            .arg(format_fps(fps))
            .with_output(output)
    }

    /// Join the rendered video with the trimmed audio.
    pub fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaCommand {
        self.base()
            .arg("-i")
            .path_arg(video)
            .arg("-i")
            .path_arg(audio)
            .args(["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a", "aac"])
            .arg("-shortest")
            .with_output(output)
    }

    /// Decode the first audio stream as mono f64le PCM on stdout.
    pub fn extract_pcm(&self, input: &Path, sample_rate: u32) -> MediaCommand {
        MediaCommand::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .path_arg(input)
            .args(["-vn", "-ac", "1", "-ar"])
            .arg(sample_rate.to_string())
            .args(["-f", "f64le", "-acodec", "pcm_f64le", "pipe:1"])
    }
}

/// Where a take's pre-trim starts on its own clock.
pub fn take_cut_start(start_offset: f64, start: f64) -> f64 {
    (start_offset + start).max(0.0)
}

fn format_secs(secs: f64) -> String {
    format!("{:.3}", secs)
}

fn format_fps(fps: f64) -> String {
    if fps.fract() == 0.0 {
        format!("{}", fps as u64)
    } else {
        format!("{:.3}", fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(cmd: &MediaCommand, flag: &str) -> usize {
        cmd.args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn cut_audio_seeks_and_limits() {
        let opts = FfmpegOptions::default();
        let cmd = opts.cut_audio(Path::new("ref.wav"), Path::new("out.wav"), 30.0, 15.5);

        assert_eq!(cmd.program, "ffmpeg");
        assert_eq!(cmd.args[position(&cmd, "-ss") + 1], "30.000");
        assert_eq!(cmd.args[position(&cmd, "-t") + 1], "15.500");
        assert_eq!(cmd.args.last().map(String::as_str), Some("out.wav"));
        assert_eq!(cmd.output, Some(PathBuf::from("out.wav")));
    }

    #[test]
    fn cut_video_clamps_start_and_sets_rate() {
        let opts = FfmpegOptions::default();
        let cmd = opts.cut_video(
            Path::new("take.mp4"),
            Path::new("cut.mp4"),
            -40.0,
            30.0,
            30.0,
            30.0,
        );

        assert_eq!(cmd.args[position(&cmd, "-ss") + 1], "0.000");
        assert_eq!(cmd.args[position(&cmd, "-r") + 1], "30");
        assert_eq!(cmd.args[position(&cmd, "-c:v") + 1], "libx264");
        assert!(cmd.args.contains(&"-an".to_string()));
    }

    #[test]
    fn take_cut_start_shifts_by_offset() {
        assert_eq!(take_cut_start(-2.0, 30.0), 28.0);
        assert_eq!(take_cut_start(3.0, 30.0), 33.0);
        assert_eq!(take_cut_start(-31.0, 30.0), 0.0);
    }

    #[test]
    fn force_flag_controls_overwrite() {
        let keep = FfmpegOptions {
            force: false,
            ..FfmpegOptions::default()
        };
        let cmd = keep.mux(Path::new("v.mp4"), Path::new("a.wav"), Path::new("o.mp4"));
        assert!(cmd.args.contains(&"-n".to_string()));
        assert!(!cmd.args.contains(&"-y".to_string()));
    }

    #[test]
    fn extract_pcm_writes_to_stdout() {
        let cmd = FfmpegOptions::default().extract_pcm(Path::new("take.mov"), 8000);
        assert_eq!(cmd.args[position(&cmd, "-ar") + 1], "8000");
        assert_eq!(cmd.args.last().map(String::as_str), Some("pipe:1"));
        assert!(cmd.output.is_none());
    }

    #[test]
    fn display_quotes_spaced_arguments() {
        let cmd = MediaCommand::new("ffmpeg").args(["-i", "my take.mp4"]);
        assert_eq!(cmd.to_string(), "ffmpeg -i \"my take.mp4\"");
    }
}

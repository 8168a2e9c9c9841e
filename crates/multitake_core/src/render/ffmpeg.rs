//! ffmpeg-backed frame source and sink.
//!
//! Both talk rawvideo rgb24 over pipes. The reader keeps one decode process
//! per take and only respawns it when a seek is not the next frame in
//! sequence.

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use image::RgbImage;

use crate::models::VideoInfo;

use super::errors::{RenderError, RenderResult};
use super::{FrameSink, FrameSource};

/// Reads decoded frames of one take through an ffmpeg pipe.
pub struct FfmpegFrameReader {
    program: String,
    path: PathBuf,
    info: VideoInfo,
    process: Option<Child>,
    stdout: Option<ChildStdout>,
    /// Index of the frame the next read returns.
    position: u64,
}

impl FfmpegFrameReader {
    pub fn open(program: impl Into<String>, path: &Path, info: VideoInfo) -> RenderResult<Self> {
        if !path.exists() {
            return Err(RenderError::source_failed(
                path.display().to_string(),
                "file does not exist",
            ));
        }
        if info.width == 0 || info.height == 0 || info.fps <= 0.0 {
            return Err(RenderError::source_failed(
                path.display().to_string(),
                format!(
                    "unusable stream {}x{} @ {} fps",
                    info.width, info.height, info.fps
                ),
            ));
        }

        tracing::debug!(
            "[FFmpeg] Opened {}: {}x{} @ {:.3} fps",
            path.display(),
            info.width,
            info.height,
            info.fps
        );

        Ok(Self {
            program: program.into(),
            path: path.to_path_buf(),
            info,
            process: None,
            stdout: None,
            position: 0,
        })
    }

    fn frame_bytes(&self) -> usize {
        self.info.width as usize * self.info.height as usize * 3
    }

    fn spawn_at(&mut self, frame_index: u64) -> RenderResult<()> {
        self.stop();

        let seek_secs = frame_index as f64 / self.info.fps;
        tracing::trace!("[FFmpeg] Decoding {} from {:.3}s", self.path.display(), seek_secs);

        let mut child = Command::new(&self.program)
            .args(["-hide_banner", "-loglevel", "error", "-ss"])
            .arg(format!("{:.6}", seek_secs))
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                RenderError::source_failed(self.path.display().to_string(), format!("spawn failed: {}", e))
            })?;

        self.stdout = child.stdout.take();
        self.process = Some(child);
        self.position = frame_index;
        Ok(())
    }

    fn stop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameSource for FfmpegFrameReader {
    fn seek(&mut self, frame_index: u64) -> RenderResult<()> {
        if self.stdout.is_some() && frame_index == self.position {
            return Ok(());
        }
        self.spawn_at(frame_index)
    }

    fn next_frame(&mut self) -> RenderResult<Option<RgbImage>> {
        if self.stdout.is_none() {
            self.spawn_at(self.position)?;
        }
        let frame_bytes = self.frame_bytes();
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; frame_bytes];
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.stop();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        self.position += 1;
        let frame = RgbImage::from_raw(self.info.width, self.info.height, buffer).ok_or_else(|| {
            RenderError::source_failed(self.path.display().to_string(), "short frame buffer")
        })?;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encodes rgb24 frames to a video file through ffmpeg's stdin.
pub struct FfmpegEncoder {
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    width: u32,
    height: u32,
    output: PathBuf,
    frames: u64,
}

impl FfmpegEncoder {
    pub fn spawn(
        program: &str,
        codec: &str,
        output: &Path,
        width: u32,
        height: u32,
        fps: f64,
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 || fps <= 0.0 {
            return Err(RenderError::InvalidOutput(format!(
                "{}x{} @ {} fps",
                width, height, fps
            )));
        }

        let mut child = Command::new(program)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s"])
            .arg(format!("{}x{}", width, height))
            .arg("-r")
            .arg(format!("{}", fps))
            .args(["-i", "pipe:0", "-c:v", codec, "-pix_fmt", "yuv420p"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RenderError::sink(format!("failed to start {}: {}", program, e)))?;

        tracing::debug!(
            "[FFmpeg] Encoding {}x{} @ {} fps to {}",
            width,
            height,
            fps,
            output.display()
        );

        Ok(Self {
            stdin: child.stdin.take(),
            process: Some(child),
            width,
            height,
            output: output.to_path_buf(),
            frames: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for FfmpegEncoder {
    fn write_frame(&mut self, frame: &RgbImage) -> RenderResult<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(RenderError::FrameSize {
                width: self.width,
                height: self.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| RenderError::sink("encoder already finished"))?;
        stdin.write_all(frame.as_raw())?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> RenderResult<()> {
        // Closing stdin signals end of stream
        self.stdin = None;
        let Some(mut child) = self.process.take() else {
            return Ok(());
        };
        let status = child.wait()?;
        if !status.success() {
            return Err(RenderError::sink(format!(
                "encoder exited with {:?} writing {}",
                status.code(),
                self.output.display()
            )));
        }
        tracing::debug!(
            "[FFmpeg] Encoded {} frames to {}",
            self.frames,
            self.output.display()
        );
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

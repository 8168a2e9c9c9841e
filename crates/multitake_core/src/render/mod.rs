//! Frame rendering.
//!
//! Pulls frames per segment from one cursor per take, fits them to the
//! output aspect ratio and writes them to a single sink in schedule order.
//!
//! # Usage
//!
//! ```ignore
//! use multitake_core::render::{FfmpegEncoder, FfmpegFrameReader, Renderer};
//!
//! let renderer = Renderer::new(1080, 1920);
//! let report = renderer.render(&schedule, &mut sources, &mut encoder, Some(&cancel))?;
//! for underrun in &report.underruns {
//!     tracing::warn!("{}", underrun);
//! }
//! ```

mod errors;
pub mod ffmpeg;
mod renderer;

use image::RgbImage;

pub use errors::{RenderError, RenderResult};
pub use ffmpeg::{FfmpegEncoder, FfmpegFrameReader};
pub use renderer::{fit_frame, FrameUnderrun, RenderReport, Renderer};

/// Sequential frame cursor over one take.
pub trait FrameSource: Send {
    /// Position the cursor so the next frame returned is `frame_index`.
    fn seek(&mut self, frame_index: u64) -> RenderResult<()>;

    /// Next frame, or `None` once the take is exhausted.
    fn next_frame(&mut self) -> RenderResult<Option<RgbImage>>;
}

/// Destination for rendered frames.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> RenderResult<()>;

    /// Flush and close the output.
    fn finish(&mut self) -> RenderResult<()>;
}

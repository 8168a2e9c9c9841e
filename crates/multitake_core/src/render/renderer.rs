//! Schedule-driven frame renderer.

use std::collections::HashMap;
use std::fmt;

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::Serialize;

use crate::cancel::CancelHandle;
use crate::geometry::{aspect_of, largest_rect};
use crate::models::{RecordingId, Schedule};

use super::errors::{RenderError, RenderResult};
use super::{FrameSink, FrameSource};

/// A take ran out of frames before its segment was filled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameUnderrun {
    pub recording_id: RecordingId,
    pub cut_point_secs: f64,
    pub expected_frames: u64,
    pub produced_frames: u64,
}

impl fmt::Display for FrameUnderrun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame underrun in '{}' at {:.3}s: {} of {} frames",
            self.recording_id, self.cut_point_secs, self.produced_frames, self.expected_frames
        )
    }
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderReport {
    pub frames_written: u64,
    pub segments_rendered: usize,
    pub underruns: Vec<FrameUnderrun>,
    /// True when the pass stopped early on cancellation.
    pub cancelled: bool,
}

/// Renders a schedule at a fixed output resolution.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Render every segment of `schedule` into `sink`, in order.
    ///
    /// A source that runs dry mid-segment is recorded as an underrun and the
    /// next segment starts on time. Cancellation is checked between segments
    /// and returns the partial report without finishing the sink.
    pub fn render(
        &self,
        schedule: &Schedule,
        sources: &mut HashMap<RecordingId, Box<dyn FrameSource>>,
        sink: &mut dyn FrameSink,
        cancel: Option<&CancelHandle>,
    ) -> RenderResult<RenderReport> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidOutput(format!(
                "output size {}x{}",
                self.width, self.height
            )));
        }

        let mut report = RenderReport::default();

        for (index, segment) in schedule.segments.iter().enumerate() {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                tracing::warn!(
                    "[Render] Cancelled after {}/{} segments",
                    index,
                    schedule.segments.len()
                );
                report.cancelled = true;
                return Ok(report);
            }

            let source = sources
                .get_mut(&segment.recording_id)
                .ok_or_else(|| RenderError::MissingSource(segment.recording_id.clone()))?;

            source.seek(segment.local_start_frame)?;

            let mut produced = 0;
            while produced < segment.frame_count {
                let Some(frame) = source.next_frame()? else {
                    break;
                };
                let fitted = fit_frame(&frame, self.width, self.height, self.filter);
                sink.write_frame(&fitted)?;
                produced += 1;
            }

            report.frames_written += produced;
            report.segments_rendered += 1;

            if produced < segment.frame_count {
                let underrun = FrameUnderrun {
                    recording_id: segment.recording_id.clone(),
                    cut_point_secs: segment.cut_point_secs,
                    expected_frames: segment.frame_count,
                    produced_frames: produced,
                };
                tracing::warn!("[Render] {}", underrun);
                report.underruns.push(underrun);
            } else {
                tracing::debug!(
                    "[Render] Segment {} ({}): {} frames from {}",
                    index,
                    segment.recording_id,
                    produced,
                    segment.local_start_frame
                );
            }
        }

        sink.finish()?;
        tracing::info!(
            "[Render] Wrote {} frames in {} segments ({} underruns)",
            report.frames_written,
            report.segments_rendered,
            report.underruns.len()
        );
        Ok(report)
    }
}

/// Crop `frame` to the output aspect ratio (anchored top-left) and resize.
pub fn fit_frame(frame: &RgbImage, width: u32, height: u32, filter: FilterType) -> RgbImage {
    let (crop_w, crop_h) = largest_rect(frame.width(), frame.height(), aspect_of(width, height));
    let crop_w = crop_w.clamp(1, frame.width().max(1));
    let crop_h = crop_h.clamp(1, frame.height().max(1));
    let cropped = if (crop_w, crop_h) == frame.dimensions() {
        frame.clone()
    } else {
        imageops::crop_imm(frame, 0, 0, crop_w, crop_h).to_image()
    };

    if cropped.dimensions() == (width, height) {
        cropped
    } else {
        imageops::resize(&cropped, width, height, filter)
    }
}

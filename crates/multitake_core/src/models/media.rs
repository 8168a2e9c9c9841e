//! Loaded media: the reference track and the takes aligned against it.

use serde::{Deserialize, Serialize};

use crate::analysis::AudioData;

use super::offset::Offset;
use super::recording_id::RecordingId;

/// Video stream properties of a take, as reported by the video collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Frames per second.
    pub fps: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl VideoInfo {
    /// Convert a time in seconds to a frame index on this stream's clock.
    ///
    /// Negative times clamp to frame 0.
    pub fn frame_at(&self, secs: f64) -> u64 {
        if secs <= 0.0 || self.fps <= 0.0 {
            return 0;
        }
        (secs * self.fps).floor() as u64
    }

    /// Number of frames needed to cover `secs` seconds.
    pub fn frames_for(&self, secs: f64) -> u64 {
        if secs <= 0.0 || self.fps <= 0.0 {
            return 0;
        }
        (secs * self.fps).round() as u64
    }
}

/// One take: its embedded audio plus video properties. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Recording {
    pub id: RecordingId,
    /// Mono audio at the shared analysis sample rate.
    pub audio: AudioData,
    pub video: VideoInfo,
}

impl Recording {
    pub fn new(id: RecordingId, audio: AudioData, video: VideoInfo) -> Self {
        Self { id, audio, video }
    }
}

/// The single track every take is aligned against.
#[derive(Debug, Clone)]
pub struct ReferenceAudio {
    audio: AudioData,
}

impl ReferenceAudio {
    pub fn new(audio: AudioData) -> Self {
        Self { audio }
    }

    pub fn audio(&self) -> &AudioData {
        &self.audio
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.audio.duration_secs
    }
}

/// A take after alignment: everything the scheduler needs to know about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedTake {
    pub id: RecordingId,
    pub offset: Offset,
    pub video: VideoInfo,
}

impl AlignedTake {
    pub fn new(id: RecordingId, offset: Offset, video: VideoInfo) -> Self {
        Self { id, offset, video }
    }
}

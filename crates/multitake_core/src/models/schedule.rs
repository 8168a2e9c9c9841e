//! Schedule produced by the segment scheduler.

use serde::{Deserialize, Serialize};

use super::recording_id::RecordingId;

/// One contiguous span of the output timeline served by a single take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Take that supplies the frames.
    pub recording_id: RecordingId,
    /// First frame to read, on the take's local clock.
    pub local_start_frame: u64,
    /// Number of frames to emit.
    pub frame_count: u64,
    /// Cut point on the output timeline (seconds from output start).
    pub cut_point_secs: f64,
    /// Segment length in seconds.
    pub duration_secs: f64,
}

impl Segment {
    /// End of this segment on the output timeline.
    pub fn end_secs(&self) -> f64 {
        self.cut_point_secs + self.duration_secs
    }
}

/// Ordered, contiguous list of segments covering the requested output.
///
/// Built once per scheduling pass and never mutated afterwards; a different
/// seed produces a different `Schedule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Second of the reference track where the output begins.
    pub start_secs: f64,
    /// Requested output length in seconds.
    pub duration_secs: f64,
    pub segments: Vec<Segment>,
    /// False when construction was cancelled before the last cut point.
    pub complete: bool,
}

impl Schedule {
    /// Range of the reference audio to trim and mux with the rendered video.
    pub fn audio_range(&self) -> (f64, f64) {
        (self.start_secs, self.start_secs + self.duration_secs)
    }

    /// Sum of segment durations.
    pub fn covered_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    /// Total number of frames across all segments.
    pub fn total_frames(&self) -> u64 {
        self.segments.iter().map(|s| s.frame_count).sum()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Serialize to pretty JSON (for `--dry-run` and the schedule sidecar file).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(cut: f64, dur: f64) -> Segment {
        Segment {
            recording_id: RecordingId::new("a"),
            local_start_frame: 0,
            frame_count: (dur * 30.0) as u64,
            cut_point_secs: cut,
            duration_secs: dur,
        }
    }

    #[test]
    fn audio_range_is_offset_by_start() {
        let schedule = Schedule {
            start_secs: 30.0,
            duration_secs: 10.0,
            segments: vec![segment(0.0, 5.0), segment(5.0, 5.0)],
            complete: true,
        };
        assert_eq!(schedule.audio_range(), (30.0, 40.0));
        assert_eq!(schedule.covered_secs(), 10.0);
        assert_eq!(schedule.total_frames(), 300);
        assert_eq!(schedule.segments[1].end_secs(), 10.0);
    }

    #[test]
    fn json_contains_recording_ids() {
        let schedule = Schedule {
            start_secs: 0.0,
            duration_secs: 5.0,
            segments: vec![segment(0.0, 5.0)],
            complete: true,
        };
        let json = schedule.to_json().unwrap();
        assert!(json.contains("\"recording_id\": \"a\""));
    }
}

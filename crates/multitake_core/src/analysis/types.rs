//! Core types for audio alignment.

use serde::{Deserialize, Serialize};

use crate::models::{Offset, RecordingId};

/// Mono audio samples at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples as f64 (mono).
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl AudioData {
    /// Create new audio data from samples.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / sample_rate as f64
        };
        Self {
            samples,
            sample_rate,
            duration_secs,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if audio data is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest absolute sample value.
    pub fn peak_amplitude(&self) -> f64 {
        self.samples.iter().fold(0.0_f64, |acc, s| acc.max(s.abs()))
    }

    /// Sum of squared samples.
    pub fn energy(&self) -> f64 {
        self.samples.iter().map(|s| s * s).sum()
    }

    /// Copy out `[start_secs, start_secs + duration_secs)`, clipped to the buffer.
    pub fn slice_secs(&self, start_secs: f64, duration_secs: f64) -> AudioData {
        let rate = self.sample_rate as f64;
        let start = ((start_secs.max(0.0)) * rate) as usize;
        let end = (((start_secs + duration_secs).max(0.0)) * rate) as usize;
        let start = start.min(self.samples.len());
        let end = end.clamp(start, self.samples.len());
        AudioData::new(self.samples[start..end].to_vec(), self.sample_rate)
    }
}

/// Alignment of one take against the reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffsetEstimate {
    pub recording_id: RecordingId,
    /// `argmax(|xcorr|) - (Nr - 1)`.
    pub start_offset_samples: i64,
    /// `Nr - (Nt + start_offset_samples)`.
    pub end_offset_samples: i64,
    pub sample_rate: u32,
    /// Offsets converted to seconds.
    pub offset: Offset,
    /// Peak magnitude normalized by the signal energies (0.0 - 1.0).
    pub confidence: f64,
}

/// Error types for analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Source audio could not be decoded.
    #[error("Decode failed for '{source_name}': {message}")]
    Decode {
        source_name: String,
        message: String,
    },

    /// Correlation peak is not meaningful (empty or silent input, weak peak).
    #[error("Alignment ambiguous for '{recording}': {reason}")]
    AlignmentAmbiguous { recording: String, reason: String },

    /// Reference and take were decoded at different rates.
    #[error("Sample rate mismatch for '{recording}': reference {reference} Hz vs {other} Hz")]
    SampleRateMismatch {
        recording: String,
        reference: u32,
        other: u32,
    },

    /// Invalid audio data.
    #[error("Invalid audio data: {0}")]
    InvalidAudio(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn decode(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn ambiguous(recording: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AlignmentAmbiguous {
            recording: recording.into(),
            reason: reason.into(),
        }
    }
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_data_computes_duration() {
        let audio = AudioData::new(vec![0.0; 4000], 8000);
        assert!((audio.duration_secs - 0.5).abs() < 1e-12);
        assert_eq!(audio.len(), 4000);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        let audio = AudioData::new(vec![1.0; 10], 0);
        assert_eq!(audio.duration_secs, 0.0);
    }

    #[test]
    fn slice_secs_clips_to_buffer() {
        let samples: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let audio = AudioData::new(samples, 100);

        let slice = audio.slice_secs(2.0, 1.0);
        assert_eq!(slice.len(), 100);
        assert_eq!(slice.samples[0], 200.0);

        let tail = audio.slice_secs(9.5, 5.0);
        assert_eq!(tail.len(), 50);

        let outside = audio.slice_secs(20.0, 1.0);
        assert!(outside.is_empty());
    }

    #[test]
    fn peak_and_energy() {
        let audio = AudioData::new(vec![0.5, -2.0, 1.0], 10);
        assert_eq!(audio.peak_amplitude(), 2.0);
        assert_eq!(audio.energy(), 5.25);
    }

    #[test]
    fn ambiguous_error_names_recording() {
        let err = AnalysisError::ambiguous("cam_b", "silent buffer");
        let msg = err.to_string();
        assert!(msg.contains("cam_b"));
        assert!(msg.contains("silent buffer"));
    }
}

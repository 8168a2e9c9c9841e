//! Audio decoding for alignment.
//!
//! ffmpeg downmixes to mono, resamples to the analysis rate and writes raw
//! f64 little-endian samples to stdout, so every buffer handed to the
//! estimator shares one sample rate.

use std::path::Path;
use std::time::Duration;

use crate::analysis::{AnalysisError, AnalysisResult, AudioData};

use super::commands::FfmpegOptions;
use super::process::run_with_timeout;

/// Analysis sample rate used when nothing else is configured.
pub const DEFAULT_ANALYSIS_SAMPLE_RATE: u32 = 8000;

/// Decode the first audio stream of `input_path` as mono f64 at `sample_rate`.
pub fn extract_audio(
    ffmpeg: &FfmpegOptions,
    input_path: &Path,
    sample_rate: u32,
    timeout: Option<Duration>,
) -> AnalysisResult<AudioData> {
    let source_name = input_path.display().to_string();
    if !input_path.exists() {
        return Err(AnalysisError::decode(source_name, "file does not exist"));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidAudio(
            "sample rate must be positive".to_string(),
        ));
    }

    let command = ffmpeg.extract_pcm(input_path, sample_rate);
    let output = run_with_timeout(&command, timeout)
        .map_err(|e| AnalysisError::decode(&source_name, e.to_string()))?;

    let samples = bytes_to_f64_samples(&output.stdout);
    if samples.is_empty() {
        return Err(AnalysisError::decode(source_name, "no audio samples decoded"));
    }

    tracing::debug!(
        "[Audio] Extracted {} samples ({:.2}s) from {}",
        samples.len(),
        samples.len() as f64 / sample_rate as f64,
        input_path.display()
    );

    Ok(AudioData::new(samples, sample_rate))
}

/// Convert raw little-endian bytes to f64 samples, ignoring a trailing partial sample.
pub fn bytes_to_f64_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            f64::from_le_bytes(arr)
        })
        .collect()
}

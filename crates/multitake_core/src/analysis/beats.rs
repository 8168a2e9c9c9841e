//! Beat candidates from the reference track.
//!
//! Beats are detected as peaks of a spectral-flux onset envelope:
//! 1. STFT magnitude spectrogram (Hann window)
//! 2. Frame-to-frame magnitude difference, half-wave rectified
//! 3. Sum across frequency bins, normalize to 1.0
//! 4. Pick local maxima above `mean + threshold * std`, at least
//!    `min_spacing_secs` apart
//!
//! The resulting instants (seconds on the reference clock) feed the
//! beat-aligned cut policy after `to_output_timeline`.

use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use super::types::{AnalysisError, AnalysisResult, AudioData};

/// Configuration for beat detection.
#[derive(Debug, Clone)]
pub struct BeatConfig {
    /// FFT size (window length in samples).
    pub n_fft: usize,
    /// Hop between STFT frames in samples.
    pub hop_length: usize,
    /// Peak threshold in standard deviations above the envelope mean.
    pub threshold: f64,
    /// Minimum distance between two beats in seconds.
    pub min_spacing_secs: f64,
}

impl Default for BeatConfig {
    fn default() -> Self {
        // 64 ms window, 16 ms hop at the 8 kHz analysis rate
        Self {
            n_fft: 512,
            hop_length: 128,
            threshold: 1.0,
            min_spacing_secs: 0.25,
        }
    }
}

/// Spectral-flux beat detector.
#[derive(Debug, Clone, Default)]
pub struct BeatDetector {
    config: BeatConfig,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> Self {
        Self { config }
    }

    /// Detect beat instants in seconds, strictly increasing.
    pub fn detect(&self, audio: &AudioData) -> Vec<f64> {
        if audio.sample_rate == 0 || self.config.n_fft == 0 || self.config.hop_length == 0 {
            return Vec::new();
        }

        let envelope = self.onset_envelope(&audio.samples);
        if envelope.len() < 3 {
            return Vec::new();
        }

        let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
        let variance =
            envelope.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / envelope.len() as f64;
        let cutoff = mean + self.config.threshold * variance.sqrt();

        let rate = audio.sample_rate as f64;
        let frame_time = |i: usize| {
            (i * self.config.hop_length + self.config.n_fft / 2) as f64 / rate
        };

        let mut beats: Vec<(f64, f64)> = Vec::new();
        for i in 1..envelope.len() - 1 {
            let value = envelope[i];
            let is_local_max = value >= envelope[i - 1] && value > envelope[i + 1];
            if !is_local_max || value < cutoff || value <= 0.0 {
                continue;
            }

            let time = frame_time(i);
            match beats.last_mut() {
                Some(last) if time - last.0 < self.config.min_spacing_secs => {
                    // Too close: keep the stronger of the two
                    if value > last.1 {
                        *last = (time, value);
                    }
                }
                _ => beats.push((time, value)),
            }
        }

        tracing::debug!(
            "[Beats] Detected {} beats over {:.2}s",
            beats.len(),
            audio.duration_secs
        );

        beats.into_iter().map(|(t, _)| t).collect()
    }

    /// Spectral-flux onset strength envelope, normalized to a maximum of 1.0.
    fn onset_envelope(&self, samples: &[f64]) -> Vec<f64> {
        let spectrogram = self.stft_magnitude(samples);
        if spectrogram.len() < 2 {
            return Vec::new();
        }

        let mut envelope = vec![0.0; spectrogram.len()];
        for frame in 1..spectrogram.len() {
            envelope[frame] = spectrogram[frame]
                .iter()
                .zip(spectrogram[frame - 1].iter())
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();
        }

        let max_val = envelope.iter().fold(0.0_f64, |a, &b| a.max(b));
        if max_val > 1e-10 {
            for val in &mut envelope {
                *val /= max_val;
            }
        }
        envelope
    }

    /// Magnitude spectrogram, one row of positive-frequency bins per frame.
    fn stft_magnitude(&self, samples: &[f64]) -> Vec<Vec<f64>> {
        let n_fft = self.config.n_fft;
        if samples.len() < n_fft {
            return Vec::new();
        }

        let window: Vec<f64> = (0..n_fft)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n_fft as f64).cos()))
            .collect();
        let num_bins = n_fft / 2 + 1;

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);

        (0..=samples.len() - n_fft)
            .step_by(self.config.hop_length)
            .map(|start| {
                let mut buffer: Vec<Complex<f64>> = samples[start..start + n_fft]
                    .iter()
                    .zip(window.iter())
                    .map(|(&s, &w)| Complex::new(s * w, 0.0))
                    .collect();
                fft.process(&mut buffer);
                buffer.iter().take(num_bins).map(|c| c.norm()).collect()
            })
            .collect()
    }
}

/// Map reference-clock beats into the output timeline `[0, duration)`.
pub fn to_output_timeline(beats: &[f64], start_secs: f64, duration_secs: f64) -> Vec<f64> {
    beats
        .iter()
        .map(|b| b - start_secs)
        .filter(|b| *b >= 0.0 && *b < duration_secs)
        .collect()
}

/// Parse a beat list: one reference-clock instant in seconds per line.
///
/// Blank lines and `#` comments are skipped. Values must be finite and
/// non-negative; ordering is checked later by the cut policy.
pub fn parse_beat_list(text: &str) -> AnalysisResult<Vec<f64>> {
    let mut beats = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let value: f64 = line.parse().map_err(|_| {
            AnalysisError::InvalidAudio(format!(
                "beat list line {}: '{}' is not a number",
                line_no + 1,
                line
            ))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(AnalysisError::InvalidAudio(format!(
                "beat list line {}: {} is out of range",
                line_no + 1,
                value
            )));
        }
        beats.push(value);
    }
    Ok(beats)
}

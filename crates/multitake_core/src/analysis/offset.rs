//! Offset estimation of takes against the reference track.
//!
//! Every take is aligned independently, so `estimate_all` fans the work out
//! over the rayon thread pool and keys the results by recording id.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::models::{Offset, RecordingId};

use super::correlation::{cross_correlate_full, find_abs_peak, normalized_peak};
use super::types::{AnalysisError, AnalysisResult, AudioData, OffsetEstimate};

/// Amplitude below which a buffer counts as silent.
const SILENCE_THRESHOLD: f64 = 1e-9;

/// Configuration for offset estimation.
#[derive(Debug, Clone)]
pub struct OffsetConfig {
    /// Minimum normalized peak (0.0 - 1.0) to accept an alignment.
    ///
    /// 0.0 only rejects empty and silent buffers.
    pub min_confidence: f64,
}

impl Default for OffsetConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
        }
    }
}

/// Computes each take's offset relative to the reference via cross-correlation.
#[derive(Debug, Clone, Default)]
pub struct OffsetEstimator {
    config: OffsetConfig,
}

impl OffsetEstimator {
    pub fn new(config: OffsetConfig) -> Self {
        Self { config }
    }

    /// Estimate the offset of one take.
    ///
    /// `start_offset_samples = argmax(|xcorr(T, reverse(R))|) - (Nr - 1)` and
    /// `end_offset_samples = Nr - (Nt + start_offset_samples)`. A take whose
    /// audio is the reference from sample `k` onwards yields `-k`.
    pub fn estimate(
        &self,
        recording_id: &RecordingId,
        reference: &AudioData,
        target: &AudioData,
    ) -> AnalysisResult<OffsetEstimate> {
        let name = recording_id.as_str();

        if reference.sample_rate != target.sample_rate {
            return Err(AnalysisError::SampleRateMismatch {
                recording: name.to_string(),
                reference: reference.sample_rate,
                other: target.sample_rate,
            });
        }
        if reference.sample_rate == 0 {
            return Err(AnalysisError::InvalidAudio(
                "Sample rate must be positive".to_string(),
            ));
        }

        if reference.is_empty() {
            return Err(AnalysisError::ambiguous(name, "reference audio is empty"));
        }
        if target.is_empty() {
            return Err(AnalysisError::ambiguous(name, "take audio is empty"));
        }
        if reference.peak_amplitude() < SILENCE_THRESHOLD {
            return Err(AnalysisError::ambiguous(name, "reference audio is silent"));
        }
        if target.peak_amplitude() < SILENCE_THRESHOLD {
            return Err(AnalysisError::ambiguous(name, "take audio is silent"));
        }

        let correlation = cross_correlate_full(&target.samples, &reference.samples);
        let peak = find_abs_peak(&correlation)
            .ok_or_else(|| AnalysisError::ambiguous(name, "correlation has no finite peak"))?;

        let nr = reference.len() as i64;
        let nt = target.len() as i64;
        let start_offset_samples = peak.index as i64 - (nr - 1);
        let end_offset_samples = nr - (nt + start_offset_samples);

        let confidence = normalized_peak(peak.magnitude, target.energy(), reference.energy());
        if confidence < self.config.min_confidence {
            return Err(AnalysisError::ambiguous(
                name,
                format!(
                    "peak confidence {:.3} below minimum {:.3}",
                    confidence, self.config.min_confidence
                ),
            ));
        }

        let offset = Offset::from_samples(
            start_offset_samples,
            end_offset_samples,
            reference.sample_rate,
        );

        tracing::debug!(
            "[Align] {}: start {:+} samples ({:+.3}s), end {:+} samples ({:+.3}s), confidence {:.3}",
            name,
            start_offset_samples,
            offset.start_secs,
            end_offset_samples,
            offset.end_secs,
            confidence
        );

        Ok(OffsetEstimate {
            recording_id: recording_id.clone(),
            start_offset_samples,
            end_offset_samples,
            sample_rate: reference.sample_rate,
            offset,
            confidence,
        })
    }

    /// Estimate offsets for all takes in parallel.
    ///
    /// Fails with the first error in take order; nothing partial is returned.
    pub fn estimate_all(
        &self,
        reference: &AudioData,
        takes: &[(RecordingId, &AudioData)],
    ) -> AnalysisResult<BTreeMap<RecordingId, OffsetEstimate>> {
        tracing::info!("[Align] Estimating offsets for {} takes", takes.len());

        let results: Vec<AnalysisResult<OffsetEstimate>> = takes
            .par_iter()
            .map(|(id, audio)| self.estimate(id, reference, audio))
            .collect();

        let mut estimates = BTreeMap::new();
        for result in results {
            let estimate = result?;
            estimates.insert(estimate.recording_id.clone(), estimate);
        }
        Ok(estimates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    fn audio(samples: Vec<f64>) -> AudioData {
        AudioData::new(samples, 8000)
    }

    #[test]
    fn sub_slice_yields_negative_start() {
        let reference = noise(4000, 7);
        for k in [0usize, 1, 250, 1999] {
            let target = reference[k..k + 1500].to_vec();
            let estimate = OffsetEstimator::default()
                .estimate(&RecordingId::new("t"), &audio(reference.clone()), &audio(target))
                .unwrap();
            assert_eq!(estimate.start_offset_samples, -(k as i64), "k = {}", k);
        }
    }

    #[test]
    fn repeated_pulses_resolve_to_earliest_lag() {
        // A single click matches every click of a pulse-train reference
        // equally; the lowest correlation index (most negative start) wins.
        for period in 2..=24usize {
            for reps in 2..=6usize {
                let mut reference = vec![0.0; period * reps];
                for r in 0..reps {
                    reference[r * period] = 1.0;
                }
                let mut target = vec![0.0; period];
                target[0] = 1.0;

                let estimate = OffsetEstimator::default()
                    .estimate(&RecordingId::new("t"), &audio(reference), &audio(target))
                    .unwrap();
                assert_eq!(
                    estimate.start_offset_samples,
                    -((period * (reps - 1)) as i64),
                    "period {}, reps {}",
                    period,
                    reps
                );
            }
        }
    }

    #[test]
    fn take_starting_before_reference_yields_positive_start() {
        let reference = noise(3000, 11);
        // 400 samples of unrelated lead-in, then the reference
        let mut target = noise(400, 12);
        target.extend_from_slice(&reference[..2000]);

        let estimate = OffsetEstimator::default()
            .estimate(&RecordingId::new("t"), &audio(reference), &audio(target))
            .unwrap();
        assert_eq!(estimate.start_offset_samples, 400);
    }

    #[test]
    fn offsets_close_the_duration_identity() {
        let reference = noise(5000, 3);
        let target = reference[1200..4100].to_vec();
        let ref_audio = audio(reference);
        let target_audio = audio(target);

        let estimate = OffsetEstimator::default()
            .estimate(&RecordingId::new("t"), &ref_audio, &target_audio)
            .unwrap();

        assert_eq!(
            estimate.start_offset_samples + target_audio.len() as i64 + estimate.end_offset_samples,
            ref_audio.len() as i64
        );
        let total =
            estimate.offset.start_secs + target_audio.duration_secs + estimate.offset.end_secs;
        assert!((total - ref_audio.duration_secs).abs() < 1e-9);
        assert!(estimate.confidence > 0.5);
    }

    #[test]
    fn empty_take_is_ambiguous() {
        let result = OffsetEstimator::default().estimate(
            &RecordingId::new("empty"),
            &audio(noise(100, 1)),
            &audio(Vec::new()),
        );
        assert!(matches!(result, Err(AnalysisError::AlignmentAmbiguous { .. })));
    }

    #[test]
    fn silent_take_is_ambiguous() {
        let result = OffsetEstimator::default().estimate(
            &RecordingId::new("silent"),
            &audio(noise(100, 1)),
            &audio(vec![0.0; 50]),
        );
        assert!(matches!(result, Err(AnalysisError::AlignmentAmbiguous { .. })));
    }

    #[test]
    fn silent_reference_is_ambiguous() {
        let result = OffsetEstimator::default().estimate(
            &RecordingId::new("t"),
            &audio(vec![0.0; 100]),
            &audio(noise(50, 2)),
        );
        assert!(matches!(result, Err(AnalysisError::AlignmentAmbiguous { .. })));
    }

    #[test]
    fn sample_rate_mismatch_is_rejected() {
        let result = OffsetEstimator::default().estimate(
            &RecordingId::new("t"),
            &AudioData::new(noise(100, 1), 8000),
            &AudioData::new(noise(100, 2), 44100),
        );
        assert!(matches!(result, Err(AnalysisError::SampleRateMismatch { .. })));
    }

    #[test]
    fn min_confidence_rejects_weak_peaks() {
        let estimator = OffsetEstimator::new(OffsetConfig {
            min_confidence: 0.99,
        });
        // Unrelated noise correlates weakly everywhere
        let result = estimator.estimate(
            &RecordingId::new("weak"),
            &audio(noise(2000, 21)),
            &audio(noise(2000, 22)),
        );
        assert!(matches!(result, Err(AnalysisError::AlignmentAmbiguous { .. })));
    }

    #[test]
    fn estimate_all_keys_by_recording_id() {
        let reference = noise(6000, 5);
        let a = audio(reference[100..3000].to_vec());
        let b = audio(reference[2500..5500].to_vec());
        let c = audio(reference[0..1000].to_vec());
        let takes = vec![
            (RecordingId::new("b"), &b),
            (RecordingId::new("a"), &a),
            (RecordingId::new("c"), &c),
        ];

        let estimates = OffsetEstimator::default()
            .estimate_all(&audio(reference), &takes)
            .unwrap();

        assert_eq!(estimates.len(), 3);
        assert_eq!(estimates[&RecordingId::new("a")].start_offset_samples, -100);
        assert_eq!(estimates[&RecordingId::new("b")].start_offset_samples, -2500);
        assert_eq!(estimates[&RecordingId::new("c")].start_offset_samples, 0);
    }

    #[test]
    fn estimate_all_fails_fast_on_bad_take() {
        let reference = noise(1000, 5);
        let good = audio(reference[10..500].to_vec());
        let silent = audio(vec![0.0; 200]);
        let takes = vec![
            (RecordingId::new("good"), &good),
            (RecordingId::new("silent"), &silent),
        ];

        let result = OffsetEstimator::default().estimate_all(&audio(reference), &takes);
        assert!(matches!(result, Err(AnalysisError::AlignmentAmbiguous { .. })));
    }
}

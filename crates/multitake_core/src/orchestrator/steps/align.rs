//! Align step - decodes audio and estimates each take's offset.
//!
//! 1. Decode reference and takes to mono f64 at the analysis rate
//! 2. Cross-correlate every take against the reference
//! 3. Load or detect reference beats when the beat policy is active

use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::analysis::{parse_beat_list, AudioData, BeatDetector, OffsetEstimator};
use crate::config::CutPolicyKind;
use crate::media::extract_audio;
use crate::models::{Recording, RecordingId, ReferenceAudio};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{AlignOutput, Context, RunState, StepOutcome};

/// Align step for offset estimation and beat extraction.
pub struct AlignStep;

impl AlignStep {
    pub fn new() -> Self {
        Self
    }

    fn reference_beats(&self, ctx: &Context, reference: &AudioData) -> StepResult<Vec<f64>> {
        let beats_file = &ctx.settings.timeline.beats_file;
        let beats = if beats_file.is_empty() {
            let detector = BeatDetector::new(ctx.settings.analysis.beat_config());
            let beats = detector.detect(reference);
            ctx.logger
                .info(&format!("Detected {} beats in the reference", beats.len()));
            beats
        } else {
            let beats = load_beats_file(Path::new(beats_file))?;
            ctx.logger
                .info(&format!("Loaded {} beats from {}", beats.len(), beats_file));
            beats
        };
        Ok(beats)
    }
}

impl Default for AlignStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AlignStep {
    fn name(&self) -> &str {
        "Align"
    }

    fn description(&self) -> &str {
        "Estimate take offsets by audio cross-correlation"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.settings.analysis.sample_rate == 0 {
            return Err(StepError::invalid_input("analysis sample rate must be positive"));
        }
        let timeline = &ctx.settings.timeline;
        if timeline.cut_policy == CutPolicyKind::Beats && !timeline.beats_file.is_empty() {
            let path = Path::new(&timeline.beats_file);
            if !path.exists() {
                return Err(StepError::file_not_found(path.display().to_string()));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut RunState) -> StepResult<StepOutcome> {
        let ffmpeg = ctx.ffmpeg_options();
        let sample_rate = ctx.settings.analysis.sample_rate;
        let timeout = ctx.command_timeout();

        ctx.logger.section("Decoding audio");
        ctx.logger
            .command(&ffmpeg.extract_pcm(&ctx.project.reference, sample_rate).to_string());
        let reference = ReferenceAudio::new(extract_audio(
            &ffmpeg,
            &ctx.project.reference,
            sample_rate,
            timeout,
        )?);

        let probe = state.probe()?;
        let decoded: Vec<StepResult<Recording>> = ctx
            .project
            .takes
            .par_iter()
            .map(|take| {
                let video = *probe.takes.get(&take.id).ok_or_else(|| {
                    StepError::precondition_failed(format!("take '{}' was not probed", take.id))
                })?;
                let audio = extract_audio(&ffmpeg, &take.path, sample_rate, timeout)?;
                Ok(Recording::new(take.id.clone(), audio, video))
            })
            .collect();
        let recordings = decoded.into_iter().collect::<StepResult<Vec<Recording>>>()?;

        if ctx.is_cancelled() {
            return Ok(StepOutcome::Skipped("cancelled after decoding".to_string()));
        }

        ctx.logger.section("Cross-correlation");
        let pairs: Vec<(RecordingId, &AudioData)> = recordings
            .iter()
            .map(|r| (r.id.clone(), &r.audio))
            .collect();
        let estimator = OffsetEstimator::new(ctx.settings.analysis.offset_config());
        let estimates = estimator.estimate_all(reference.audio(), &pairs)?;

        for (id, estimate) in &estimates {
            ctx.logger.info(&format!(
                "{}: start {:+.3}s, end {:+.3}s (confidence {:.3})",
                id, estimate.offset.start_secs, estimate.offset.end_secs, estimate.confidence
            ));
        }

        let reference_beats = match ctx.settings.timeline.cut_policy {
            CutPolicyKind::Fixed => None,
            CutPolicyKind::Beats => Some(self.reference_beats(ctx, reference.audio())?),
        };

        state.record_alignment(AlignOutput {
            reference_duration_secs: reference.duration_secs(),
            sample_rate: reference.sample_rate(),
            estimates,
            reference_beats,
        })?;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &RunState) -> StepResult<()> {
        let alignment = state.alignment()?;
        if let Some(missing) = ctx
            .project
            .takes
            .iter()
            .find(|t| !alignment.estimates.contains_key(&t.id))
        {
            return Err(StepError::invalid_output(format!(
                "no offset for take '{}'",
                missing.id
            )));
        }
        Ok(())
    }
}

/// Read a beat list file (reference seconds, one per line).
pub fn load_beats_file(path: &Path) -> StepResult<Vec<f64>> {
    let text = fs::read_to_string(path)
        .map_err(|e| StepError::io_error(format!("reading {}", path.display()), e))?;
    parse_beat_list(&text)
        .map_err(|e| StepError::parse_error(path.display().to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::types::test_support;
    use tempfile::tempdir;

    #[test]
    fn loads_beats_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beats.txt");
        fs::write(&path, "30.0\n30.5\n# bridge\n32.25\n").unwrap();

        assert_eq!(load_beats_file(&path).unwrap(), vec![30.0, 30.5, 32.25]);
    }

    #[test]
    fn bad_beats_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("beats.txt");
        fs::write(&path, "30.0\nsoon\n").unwrap();

        assert!(matches!(
            load_beats_file(&path),
            Err(StepError::ParseError { .. })
        ));
        assert!(matches!(
            load_beats_file(&dir.path().join("absent.txt")),
            Err(StepError::IoError { .. })
        ));
    }

    #[test]
    fn missing_beats_file_fails_validation_for_beat_policy() {
        let dir = tempdir().unwrap();
        let mut ctx = test_support::context(dir.path());
        ctx.settings.timeline.beats_file = dir.path().join("beats.txt").display().to_string();

        // Ignored under the fixed policy
        assert!(AlignStep::new().validate_input(&ctx).is_ok());

        ctx.settings.timeline.cut_policy = CutPolicyKind::Beats;
        assert!(AlignStep::new().validate_input(&ctx).is_err());
    }

    #[test]
    fn beat_detection_runs_without_a_file() {
        let dir = tempdir().unwrap();
        let ctx = test_support::context(dir.path());
        let rate = 8000;
        let mut samples = vec![0.0; rate * 3];
        for click in [0.5, 1.5, 2.5] {
            let at = (click * rate as f64) as usize;
            for s in samples.iter_mut().skip(at).take(200) {
                *s = 0.9;
            }
        }
        let reference = AudioData::new(samples, rate as u32);

        let beats = AlignStep::new().reference_beats(&ctx, &reference).unwrap();
        assert!(beats.windows(2).all(|w| w[0] < w[1]));
    }
}

//! Command-line arguments and how they override the settings file.

use std::path::PathBuf;

use clap::Parser;
use multitake_core::config::{ConfigSection, CutPolicyKind, Settings};
use multitake_core::timeline::SelectionStrategy;

/// Auto-cut multi-camera takes against a reference track.
#[derive(Parser, Debug)]
#[command(name = "multitake")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Project folder holding `Audio/` (one reference) and `Videos/` (takes)
    #[arg(short, long)]
    pub folder: PathBuf,

    /// Second of the reference track where the output begins
    #[arg(short, long, value_parser = non_negative_secs)]
    pub start: Option<f64>,

    /// Output length in seconds
    #[arg(short, long, value_parser = positive_secs)]
    pub duration: Option<f64>,

    /// Cut every STEP seconds
    #[arg(long, value_parser = positive_secs, conflicts_with = "beats")]
    pub step: Option<f64>,

    /// Cut on beats: `auto` detects them, anything else is a beat list file
    #[arg(long, value_name = "auto|FILE")]
    pub beats: Option<String>,

    /// Seed for random take selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Take selection policy
    #[arg(long, value_name = "random|round-robin|fixed", value_parser = selection_strategy)]
    pub policy: Option<SelectionStrategy>,

    /// Settings file, created with defaults if missing
    #[arg(short, long, default_value = ".config/multitake.toml")]
    pub config: PathBuf,

    /// Output folder (overrides `[paths] output_folder`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the per-run work directory
    #[arg(long)]
    pub keep_temp: bool,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Print the schedule as JSON without rendering
    #[arg(long)]
    pub dry_run: bool,

    /// Write the given overrides back to the settings file
    #[arg(long)]
    pub save: bool,
}

impl Args {
    /// Apply flag overrides on top of the loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        let timeline = &mut settings.timeline;
        if let Some(start) = self.start {
            timeline.start_secs = start;
        }
        if let Some(duration) = self.duration {
            timeline.duration_secs = duration;
        }
        if let Some(step) = self.step {
            timeline.cut_policy = CutPolicyKind::Fixed;
            timeline.step_secs = step;
        }
        if let Some(beats) = &self.beats {
            timeline.cut_policy = CutPolicyKind::Beats;
            timeline.beats_file = if beats.eq_ignore_ascii_case("auto") {
                String::new()
            } else {
                beats.clone()
            };
        }

        if let Some(seed) = self.seed {
            settings.selection.seed = Some(seed);
        }
        if let Some(policy) = self.policy {
            settings.selection.policy = policy;
        }

        if let Some(output) = &self.output {
            settings.paths.output_folder = output.to_string_lossy().into_owned();
        }
        if self.keep_temp {
            settings.output.keep_temp = true;
        }
    }

    /// Settings sections touched by flags, for `--save`.
    pub fn sections_to_save(&self) -> Vec<ConfigSection> {
        if !self.save {
            return Vec::new();
        }
        let mut sections = Vec::new();
        if self.start.is_some()
            || self.duration.is_some()
            || self.step.is_some()
            || self.beats.is_some()
        {
            sections.push(ConfigSection::Timeline);
        }
        if self.seed.is_some() || self.policy.is_some() {
            sections.push(ConfigSection::Selection);
        }
        if self.output.is_some() {
            sections.push(ConfigSection::Paths);
        }
        if self.keep_temp {
            sections.push(ConfigSection::Output);
        }
        sections
    }
}

fn parse_secs(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() {
        return Err(format!("'{}' is not finite", value));
    }
    Ok(secs)
}

fn non_negative_secs(value: &str) -> Result<f64, String> {
    let secs = parse_secs(value)?;
    if secs < 0.0 {
        return Err(format!("must not be negative, got {}", secs));
    }
    Ok(secs)
}

fn positive_secs(value: &str) -> Result<f64, String> {
    let secs = parse_secs(value)?;
    if secs <= 0.0 {
        return Err(format!("must be positive, got {}", secs));
    }
    Ok(secs)
}

fn selection_strategy(value: &str) -> Result<SelectionStrategy, String> {
    SelectionStrategy::parse(value)
        .ok_or_else(|| format!("unknown policy '{}' (random, round-robin, fixed)", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("multitake").chain(args.iter().copied()))
    }

    #[test]
    fn overrides_timeline_and_selection() {
        let args = parse(&[
            "--folder", "gig", "--start", "12.5", "--duration", "20", "--step", "2",
            "--seed", "42", "--policy", "round-robin", "--keep-temp",
        ])
        .unwrap();

        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.timeline.start_secs, 12.5);
        assert_eq!(settings.timeline.duration_secs, 20.0);
        assert_eq!(settings.timeline.step_secs, 2.0);
        assert_eq!(settings.timeline.cut_policy, CutPolicyKind::Fixed);
        assert_eq!(settings.selection.seed, Some(42));
        assert_eq!(settings.selection.policy, SelectionStrategy::RoundRobin);
        assert!(settings.output.keep_temp);
    }

    #[test]
    fn beats_auto_clears_the_beat_file() {
        let mut settings = Settings::default();
        settings.timeline.beats_file = "old.txt".to_string();

        parse(&["-f", "gig", "--beats", "auto"]).unwrap().apply(&mut settings);
        assert_eq!(settings.timeline.cut_policy, CutPolicyKind::Beats);
        assert!(settings.timeline.beats_file.is_empty());

        parse(&["-f", "gig", "--beats", "beats.txt"]).unwrap().apply(&mut settings);
        assert_eq!(settings.timeline.beats_file, "beats.txt");
    }

    #[test]
    fn rejects_negative_and_zero_times() {
        assert!(parse(&["-f", "gig", "--start", "-1"]).is_err());
        assert!(parse(&["-f", "gig", "--duration", "0"]).is_err());
        assert!(parse(&["-f", "gig", "--step", "nan"]).is_err());
        assert!(parse(&["-f", "gig", "--start", "0"]).is_ok());
    }

    #[test]
    fn step_and_beats_conflict() {
        assert!(parse(&["-f", "gig", "--step", "2", "--beats", "auto"]).is_err());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(parse(&["-f", "gig", "--policy", "best"]).is_err());
    }

    #[test]
    fn save_writes_only_overridden_sections() {
        let args = parse(&["-f", "gig", "--step", "2", "--seed", "9", "--save"]).unwrap();
        assert_eq!(
            args.sections_to_save(),
            vec![ConfigSection::Timeline, ConfigSection::Selection]
        );

        let args = parse(&["-f", "gig", "--step", "2"]).unwrap();
        assert!(args.sections_to_save().is_empty());
    }

    #[test]
    fn untouched_flags_keep_settings() {
        let mut settings = Settings::default();
        settings.timeline.step_secs = 7.0;
        parse(&["-f", "gig"]).unwrap().apply(&mut settings);
        assert_eq!(settings.timeline.step_secs, 7.0);
        assert_eq!(settings.selection.seed, None);
    }
}

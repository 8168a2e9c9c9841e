//! Settings struct with TOML-based sections.
//!
//! Each section maps to one TOML table and can be rewritten on its own.
//! Every field has a default so partial files load.

use serde::{Deserialize, Serialize};

use crate::analysis::{BeatConfig, OffsetConfig};
use crate::logging::{LogConfig, LogLevel};
use crate::media::{ProbeConfig, DEFAULT_ANALYSIS_SAMPLE_RATE};
use crate::timeline::{CutPolicy, SelectionStrategy, DEFAULT_BEAT_LOOKAHEAD_SECS};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Output, temp and log folders.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Audio alignment and beat detection.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Output window and cut policy.
    #[serde(default)]
    pub timeline: TimelineSettings,

    /// Take selection policy.
    #[serde(default)]
    pub selection: SelectionSettings,

    /// Rendered output format.
    #[serde(default)]
    pub output: OutputSettings,

    /// ffprobe timeouts and retries.
    #[serde(default)]
    pub probe: ProbeConfig,
}

impl Settings {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let t = &self.timeline;
        if !t.start_secs.is_finite() || t.start_secs < 0.0 {
            return Err(format!("timeline.start_secs must be >= 0, got {}", t.start_secs));
        }
        if !t.duration_secs.is_finite() || t.duration_secs <= 0.0 {
            return Err(format!(
                "timeline.duration_secs must be > 0, got {}",
                t.duration_secs
            ));
        }
        if t.cut_policy == CutPolicyKind::Fixed && !(t.step_secs > 0.0) {
            return Err(format!("timeline.step_secs must be > 0, got {}", t.step_secs));
        }
        if !(t.lookahead_secs > 0.0) {
            return Err(format!(
                "timeline.lookahead_secs must be > 0, got {}",
                t.lookahead_secs
            ));
        }
        if self.analysis.sample_rate == 0 {
            return Err("analysis.sample_rate must be > 0".to_string());
        }
        let o = &self.output;
        if o.width == 0 || o.height == 0 {
            return Err(format!("output size {}x{} is invalid", o.width, o.height));
        }
        if !(o.fps > 0.0) {
            return Err(format!("output.fps must be > 0, got {}", o.fps));
        }
        Ok(())
    }
}

/// Path configuration for output, temp, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Folder for rendered videos and schedule sidecars.
    pub output_folder: String,
    /// Root folder for per-run work directories.
    pub temp_root: String,
    /// Folder for run log files.
    pub logs_folder: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: "multitake_output".to_string(),
            temp_root: ".temp".to_string(),
            logs_folder: ".logs".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level written to the console.
    pub level: LogLevel,
    /// Filter progress lines and show a tail on error.
    pub compact: bool,
    /// Number of lines shown on error.
    pub error_tail: u32,
    /// Progress update step percentage.
    pub progress_step: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            error_tail: 20,
            progress_step: 20,
        }
    }
}

impl LoggingSettings {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            progress_step: self.progress_step,
            error_tail: self.error_tail as usize,
            show_timestamps: true,
        }
    }
}

/// Audio analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Rate every buffer is decoded at before correlation.
    pub sample_rate: u32,
    /// Minimum normalized correlation peak; weaker peaks fail alignment.
    pub min_confidence: f64,
    /// Beat detection FFT size.
    pub beat_n_fft: usize,
    /// Beat detection hop length.
    pub beat_hop_length: usize,
    /// Beat peak threshold in standard deviations.
    pub beat_threshold: f64,
    /// Minimum spacing between detected beats.
    pub beat_min_spacing_secs: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let beats = BeatConfig::default();
        Self {
            sample_rate: DEFAULT_ANALYSIS_SAMPLE_RATE,
            min_confidence: OffsetConfig::default().min_confidence,
            beat_n_fft: beats.n_fft,
            beat_hop_length: beats.hop_length,
            beat_threshold: beats.threshold,
            beat_min_spacing_secs: beats.min_spacing_secs,
        }
    }
}

impl AnalysisSettings {
    pub fn offset_config(&self) -> OffsetConfig {
        OffsetConfig {
            min_confidence: self.min_confidence,
        }
    }

    pub fn beat_config(&self) -> BeatConfig {
        BeatConfig {
            n_fft: self.beat_n_fft,
            hop_length: self.beat_hop_length,
            threshold: self.beat_threshold,
            min_spacing_secs: self.beat_min_spacing_secs,
        }
    }
}

/// Which cut policy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutPolicyKind {
    /// Cut every `step_secs`.
    #[default]
    Fixed,
    /// Cut on beats (from `beats_file`, or detected from the reference).
    Beats,
}

/// Output window and cut policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    /// Second of the reference track where the output begins.
    pub start_secs: f64,
    /// Output length in seconds.
    pub duration_secs: f64,
    pub cut_policy: CutPolicyKind,
    /// Segment length for the fixed policy.
    pub step_secs: f64,
    /// Availability check window for beat segments.
    pub lookahead_secs: f64,
    /// Text file with one beat instant (reference seconds) per line.
    /// Empty means detect beats from the reference audio.
    pub beats_file: String,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            start_secs: 30.0,
            duration_secs: 30.0,
            cut_policy: CutPolicyKind::Fixed,
            step_secs: 5.0,
            lookahead_secs: DEFAULT_BEAT_LOOKAHEAD_SECS,
            beats_file: String::new(),
        }
    }
}

impl TimelineSettings {
    /// Fixed-interval policy from these settings.
    pub fn fixed_policy(&self) -> CutPolicy {
        CutPolicy::fixed(self.step_secs)
    }

    /// Beat-aligned policy over output-timeline beat instants.
    pub fn beat_policy(&self, beats: Vec<f64>) -> CutPolicy {
        CutPolicy::BeatAligned {
            beats,
            lookahead: self.lookahead_secs,
        }
    }
}

/// Take selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionSettings {
    pub policy: SelectionStrategy,
    /// RNG seed; a fresh one is drawn per run when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Candidate position used by the fixed policy.
    pub fixed_index: usize,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            policy: SelectionStrategy::Random,
            seed: None,
            fixed_index: 0,
        }
    }
}

/// Rendered output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Video codec for take pre-trims and the final encode.
    pub codec: String,
    /// ffmpeg executable.
    pub ffmpeg: String,
    /// Parallel ffmpeg jobs for pre-trimming (0 = one per CPU).
    pub workers: usize,
    /// Timeout for a single ffmpeg job in seconds (0 = none).
    pub command_timeout_secs: u64,
    /// Keep the per-run work directory.
    pub keep_temp: bool,
    /// Write the schedule as JSON next to the output.
    pub write_schedule: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30.0,
            codec: "libx264".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            workers: 0,
            command_timeout_secs: 600,
            keep_temp: false,
            write_schedule: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Analysis,
    Timeline,
    Selection,
    Output,
    Probe,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Analysis,
        ConfigSection::Timeline,
        ConfigSection::Selection,
        ConfigSection::Output,
        ConfigSection::Probe,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Timeline => "timeline",
            ConfigSection::Selection => "selection",
            ConfigSection::Output => "output",
            ConfigSection::Probe => "probe",
        }
    }

    /// Comment written above the section in generated files.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and working directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Analysis => "Audio alignment and beat detection",
            ConfigSection::Timeline => "Output window and cut policy",
            ConfigSection::Selection => "Take selection",
            ConfigSection::Output => "Rendered output",
            ConfigSection::Probe => "ffprobe timeouts and retries",
        }
    }
}

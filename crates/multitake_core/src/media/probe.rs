//! ffprobe queries with a bounded retry budget.
//!
//! Freshly written files occasionally report no duration on the first
//! probe. Each query is retried at most `max_retries` times, each attempt
//! under its own timeout, then gives up with `ProbeExhausted`.

use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::VideoInfo;

use super::commands::MediaCommand;
use super::errors::{MediaError, MediaResult};
use super::process::run_with_timeout;

/// Probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// ffprobe executable.
    pub program: String,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Pause between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 250,
        }
    }
}

impl ProbeConfig {
    fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Container duration of a media file in seconds.
pub fn probe_duration(path: &Path, config: &ProbeConfig) -> MediaResult<f64> {
    let command = MediaCommand::new(&config.program)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path.to_string_lossy().into_owned());

    with_retries(path, config, || {
        let output = run_with_timeout(&command, config.timeout())?;
        parse_duration_output(&String::from_utf8_lossy(&output.stdout))
    })
}

/// Duration, frame rate and size of the first video stream.
pub fn probe_video(path: &Path, config: &ProbeConfig) -> MediaResult<VideoInfo> {
    let command = MediaCommand::new(&config.program)
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=r_frame_rate,avg_frame_rate,width,height,duration",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path.to_string_lossy().into_owned());

    let info = with_retries(path, config, || {
        let output = run_with_timeout(&command, config.timeout())?;
        parse_probe_json(&String::from_utf8_lossy(&output.stdout))
    })?;

    tracing::info!(
        "[Probe] {}: {}x{} @ {:.3} fps, {:.2}s",
        path.file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default(),
        info.width,
        info.height,
        info.fps,
        info.duration_secs
    );
    Ok(info)
}

fn with_retries<T>(
    path: &Path,
    config: &ProbeConfig,
    mut attempt: impl FnMut() -> MediaResult<T>,
) -> MediaResult<T> {
    if !path.exists() {
        return Err(MediaError::NotFound(path.to_path_buf()));
    }

    let attempts = config.max_retries.saturating_add(1);
    let mut last_error = String::new();
    for n in 1..=attempts {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    "[Probe] Attempt {}/{} for {} failed: {}",
                    n,
                    attempts,
                    path.display(),
                    e
                );
                last_error = e.to_string();
            }
        }
        if n < attempts && config.retry_delay_ms > 0 {
            thread::sleep(Duration::from_millis(config.retry_delay_ms));
        }
    }

    Err(MediaError::ProbeExhausted {
        path: path.to_path_buf(),
        attempts,
        last_error,
    })
}

/// Parse the bare `format=duration` output.
pub fn parse_duration_output(output: &str) -> MediaResult<f64> {
    let trimmed = output.trim();
    let duration: f64 = trimmed
        .parse()
        .map_err(|_| MediaError::parse(format!("invalid duration '{}'", trimmed)))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::parse(format!("non-positive duration {}", duration)));
    }
    Ok(duration)
}

/// Parse `num/den` or a plain number into frames per second.
pub fn parse_fps_fraction(s: &str) -> Option<f64> {
    let fps = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.trim().parse().ok()?,
    };
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// Extract `VideoInfo` from ffprobe JSON output.
///
/// Stream duration wins over format duration (MKV often only has the latter).
/// `r_frame_rate` wins over `avg_frame_rate`.
pub fn parse_probe_json(json: &str) -> MediaResult<VideoInfo> {
    let data: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| MediaError::parse(format!("invalid ffprobe JSON: {}", e)))?;

    let stream = data
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| MediaError::parse("no video stream"))?;

    let fps = ["r_frame_rate", "avg_frame_rate"]
        .iter()
        .filter_map(|key| stream.get(*key).and_then(|v| v.as_str()))
        .find_map(parse_fps_fraction)
        .ok_or_else(|| MediaError::parse("missing frame rate"))?;

    let dimension = |key: &str| {
        stream
            .get(key)
            .and_then(|v| v.as_u64())
            .filter(|v| *v > 0)
            .map(|v| v as u32)
            .ok_or_else(|| MediaError::parse(format!("missing {}", key)))
    };
    let width = dimension("width")?;
    let height = dimension("height")?;

    let duration_of = |value: Option<&serde_json::Value>| {
        value
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
    };
    let duration_secs = duration_of(stream.get("duration"))
        .or_else(|| duration_of(data.get("format").and_then(|f| f.get("duration"))))
        .ok_or_else(|| MediaError::parse("missing duration"))?;

    Ok(VideoInfo {
        duration_secs,
        fps,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fps_fractions() {
        assert_eq!(parse_fps_fraction("30/1"), Some(30.0));
        assert!((parse_fps_fraction("30000/1001").unwrap() - 29.97).abs() < 0.001);
        assert_eq!(parse_fps_fraction("25"), Some(25.0));
        assert_eq!(parse_fps_fraction("0/0"), None);
        assert_eq!(parse_fps_fraction("abc"), None);
    }

    #[test]
    fn parses_duration_output() {
        assert_eq!(parse_duration_output("12.500000\n").unwrap(), 12.5);
        assert!(parse_duration_output("N/A").is_err());
        assert!(parse_duration_output("0").is_err());
    }

    #[test]
    fn parses_stream_json() {
        let json = r#"{
            "streams": [{"r_frame_rate": "30/1", "avg_frame_rate": "30/1",
                         "width": 1920, "height": 1080, "duration": "42.5"}],
            "format": {"duration": "43.0"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.fps, 30.0);
        assert_eq!(info.duration_secs, 42.5);
    }

    #[test]
    fn falls_back_to_format_duration_and_avg_rate() {
        let json = r#"{
            "streams": [{"r_frame_rate": "0/0", "avg_frame_rate": "24000/1001",
                         "width": 720, "height": 1280}],
            "format": {"duration": "10.0"}
        }"#;
        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.duration_secs, 10.0);
        assert!((info.fps - 23.976).abs() < 0.001);
    }

    #[test]
    fn rejects_json_without_video() {
        assert!(parse_probe_json(r#"{"streams": []}"#).is_err());
        assert!(parse_probe_json("not json").is_err());
    }

    #[test]
    fn missing_file_fails_without_retrying() {
        let config = ProbeConfig {
            retry_delay_ms: 0,
            ..ProbeConfig::default()
        };
        let err = probe_duration(Path::new("/nonexistent/take.mp4"), &config).unwrap_err();
        assert!(matches!(err, MediaError::NotFound(_)));
    }

    #[test]
    fn retries_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mp4");
        std::fs::write(&path, b"").unwrap();

        let config = ProbeConfig {
            max_retries: 2,
            retry_delay_ms: 0,
            ..ProbeConfig::default()
        };
        let mut calls = 0;
        let err = with_retries(&path, &config, || -> MediaResult<f64> {
            calls += 1;
            Err(MediaError::parse("no duration yet"))
        })
        .unwrap_err();

        assert_eq!(calls, 3);
        match err {
            MediaError::ProbeExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("no duration yet"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn retry_stops_at_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mp4");
        std::fs::write(&path, b"").unwrap();

        let config = ProbeConfig {
            retry_delay_ms: 0,
            ..ProbeConfig::default()
        };
        let mut calls = 0;
        let value = with_retries(&path, &config, || {
            calls += 1;
            if calls < 2 {
                Err(MediaError::parse("not yet"))
            } else {
                Ok(7.5)
            }
        })
        .unwrap();

        assert_eq!(value, 7.5);
        assert_eq!(calls, 2);
    }
}

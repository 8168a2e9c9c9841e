//! Cut point policies.
//!
//! A policy turns the requested output duration into an ordered list of
//! cut points: strictly increasing, starting at 0, all below the duration.
//! Each cut point carries the length of the segment it opens.

use serde::{Deserialize, Serialize};

use super::errors::{ScheduleError, ScheduleResult};

/// Tolerance for float comparisons against the output duration.
const EPSILON: f64 = 1e-9;

/// Default lookahead for beat-aligned cuts, in seconds.
pub const DEFAULT_BEAT_LOOKAHEAD_SECS: f64 = 10.0;

/// How the output timeline is divided into segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CutPolicy {
    /// Cuts at `0, step, 2·step, …` below the duration.
    FixedInterval { step: f64 },
    /// Cuts at beat instants (output-timeline seconds, increasing, no duplicates).
    ///
    /// `lookahead` bounds the window over which availability is checked for
    /// each beat segment.
    BeatAligned { beats: Vec<f64>, lookahead: f64 },
}

impl CutPolicy {
    pub fn fixed(step: f64) -> Self {
        Self::FixedInterval { step }
    }

    pub fn beats(beats: Vec<f64>) -> Self {
        Self::BeatAligned {
            beats,
            lookahead: DEFAULT_BEAT_LOOKAHEAD_SECS,
        }
    }

    /// Policy name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            CutPolicy::FixedInterval { .. } => "fixed",
            CutPolicy::BeatAligned { .. } => "beats",
        }
    }

    /// Produce the cut points for an output of `duration` seconds.
    ///
    /// Any contract violation is returned as `InvalidCutPoints` before
    /// scheduling starts.
    pub fn plan(&self, duration: f64) -> ScheduleResult<Vec<CutPoint>> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ScheduleError::invalid_cut_points(format!(
                "output duration must be positive, got {}",
                duration
            )));
        }

        let points = match self {
            CutPolicy::FixedInterval { step } => fixed_interval(*step, duration)?,
            CutPolicy::BeatAligned { beats, lookahead } => {
                beat_aligned(beats, *lookahead, duration)?
            }
        };

        validate(&points, duration)?;
        Ok(points)
    }
}

/// A cut point on the output timeline and the segment it opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoint {
    /// Seconds from output start.
    pub at_secs: f64,
    /// Distance to the next cut point, or remainder to the output end.
    pub duration_secs: f64,
    /// Duration used for the availability check.
    pub check_secs: f64,
}

impl CutPoint {
    fn new(at_secs: f64, duration_secs: f64) -> Self {
        Self {
            at_secs,
            duration_secs,
            check_secs: duration_secs,
        }
    }
}

fn fixed_interval(step: f64, duration: f64) -> ScheduleResult<Vec<CutPoint>> {
    if !step.is_finite() || step <= 0.0 {
        return Err(ScheduleError::invalid_cut_points(format!(
            "step must be positive, got {}",
            step
        )));
    }

    // Integer multiples avoid accumulating float error
    let mut starts = Vec::new();
    let mut k: u64 = 0;
    loop {
        let at = k as f64 * step;
        if at >= duration - EPSILON {
            break;
        }
        starts.push(at);
        k += 1;
    }

    Ok(segments_from_starts(&starts, duration))
}

fn beat_aligned(beats: &[f64], lookahead: f64, duration: f64) -> ScheduleResult<Vec<CutPoint>> {
    if !lookahead.is_finite() || lookahead <= 0.0 {
        return Err(ScheduleError::invalid_cut_points(format!(
            "lookahead must be positive, got {}",
            lookahead
        )));
    }
    if let Some(bad) = beats.iter().find(|b| !b.is_finite()) {
        return Err(ScheduleError::invalid_cut_points(format!(
            "beat instant {} is not finite",
            bad
        )));
    }
    if let Some(pair) = beats.windows(2).find(|w| w[1] <= w[0]) {
        return Err(ScheduleError::invalid_cut_points(format!(
            "beats must be strictly increasing ({} followed by {})",
            pair[0], pair[1]
        )));
    }

    let mut starts: Vec<f64> = beats
        .iter()
        .copied()
        .filter(|&b| b >= 0.0 && b < duration - EPSILON)
        .collect();
    if starts.first().map_or(true, |&first| first > 0.0) {
        starts.insert(0, 0.0);
    }

    let mut points = segments_from_starts(&starts, duration);
    for point in &mut points {
        point.check_secs = point.duration_secs.min(lookahead);
    }
    Ok(points)
}

fn segments_from_starts(starts: &[f64], duration: f64) -> Vec<CutPoint> {
    starts
        .iter()
        .enumerate()
        .map(|(i, &at)| {
            let end = starts.get(i + 1).copied().unwrap_or(duration);
            CutPoint::new(at, end - at)
        })
        .collect()
}

/// Check the cut point contract: non-empty, starts at 0, strictly
/// increasing, below `duration`, durations summing to `duration`.
pub fn validate(points: &[CutPoint], duration: f64) -> ScheduleResult<()> {
    let first = points
        .first()
        .ok_or_else(|| ScheduleError::invalid_cut_points("no cut points"))?;
    if first.at_secs != 0.0 {
        return Err(ScheduleError::invalid_cut_points(format!(
            "first cut point must be 0, got {}",
            first.at_secs
        )));
    }
    if let Some(pair) = points.windows(2).find(|w| w[1].at_secs <= w[0].at_secs) {
        return Err(ScheduleError::invalid_cut_points(format!(
            "cut points must be strictly increasing ({} followed by {})",
            pair[0].at_secs, pair[1].at_secs
        )));
    }
    if let Some(last) = points.last() {
        if last.at_secs >= duration {
            return Err(ScheduleError::invalid_cut_points(format!(
                "cut point {} is not below the output duration {}",
                last.at_secs, duration
            )));
        }
    }
    let total: f64 = points.iter().map(|p| p.duration_secs).sum();
    if (total - duration).abs() > 1e-6 {
        return Err(ScheduleError::invalid_cut_points(format!(
            "segment durations sum to {} instead of {}",
            total, duration
        )));
    }
    Ok(())
}

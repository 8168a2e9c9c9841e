//! Time offsets of a take relative to the reference track.

use serde::{Deserialize, Serialize};

/// Offset of one take relative to the reference, in seconds.
///
/// `start_secs` is the shift that maximizes correlation with the reference;
/// a take whose audio equals the reference from sample `k` onwards has
/// `start_secs == -k / sample_rate`. `end_secs` is derived from it so that
/// `start_secs + take_duration + end_secs == reference_duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl Offset {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    /// Build from sample offsets at the given sample rate.
    pub fn from_samples(start_samples: i64, end_samples: i64, sample_rate: u32) -> Self {
        let rate = sample_rate as f64;
        Self {
            start_secs: start_samples as f64 / rate,
            end_secs: end_samples as f64 / rate,
        }
    }

    /// Derive the end offset from the start offset and both durations.
    pub fn from_start(start_secs: f64, take_duration: f64, reference_duration: f64) -> Self {
        Self {
            start_secs,
            end_secs: reference_duration - (take_duration + start_secs),
        }
    }

    /// Take duration implied by this offset and the reference duration.
    pub fn take_duration(&self, reference_duration: f64) -> f64 {
        reference_duration - self.start_secs - self.end_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_samples_converts_to_seconds() {
        let offset = Offset::from_samples(-16000, 4000, 8000);
        assert_eq!(offset.start_secs, -2.0);
        assert_eq!(offset.end_secs, 0.5);
    }

    #[test]
    fn from_start_closes_the_duration_identity() {
        let offset = Offset::from_start(-1.25, 12.0, 20.0);
        let total = offset.start_secs + 12.0 + offset.end_secs;
        assert!((total - 20.0).abs() < 1e-12);
        assert!((offset.take_duration(20.0) - 12.0).abs() < 1e-12);
    }
}

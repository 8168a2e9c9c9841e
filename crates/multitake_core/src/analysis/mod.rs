//! Audio analysis: alignment of takes and beat detection.
//!
//! # Architecture
//!
//! Pure functions over decoded sample buffers, no I/O:
//!
//! 1. **Correlation** (`correlation`): FFT-based full cross-correlation and
//!    first-index peak search.
//!
//! 2. **Offset estimation** (`offset`): per-take start/end offsets against the
//!    reference, parallel across takes, keyed by recording id.
//!
//! 3. **Beat detection** (`beats`): spectral-flux onset peaks of the reference,
//!    used as cut points by the beat-aligned policy.
//!
//! # Usage
//!
//! ```ignore
//! use multitake_core::analysis::{AudioData, OffsetEstimator};
//!
//! let estimator = OffsetEstimator::default();
//! let estimates = estimator.estimate_all(&reference, &takes)?;
//! for (id, estimate) in &estimates {
//!     println!("{}: {:+.3}s", id, estimate.offset.start_secs);
//! }
//! ```

pub mod beats;
mod correlation;
mod offset;
pub mod types;

pub use types::{AnalysisError, AnalysisResult, AudioData, OffsetEstimate};

pub use correlation::{cross_correlate_full, find_abs_peak, normalized_peak, CorrelationPeak};

pub use offset::{OffsetConfig, OffsetEstimator};

pub use beats::{parse_beat_list, BeatConfig, BeatDetector};

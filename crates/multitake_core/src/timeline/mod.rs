//! Output timeline construction.
//!
//! # Architecture
//!
//! 1. **Cut points** (`cut_points`): fixed-interval or beat-aligned division
//!    of the output duration.
//!
//! 2. **Availability** (`availability`): stateless predicate over a take's
//!    offset deciding whether it covers a segment.
//!
//! 3. **Selection** (`selection`): seedable policy choosing among the
//!    available takes.
//!
//! 4. **Scheduler** (`scheduler`): state machine tying the three together
//!    into an immutable `Schedule`.
//!
//! # Usage
//!
//! ```ignore
//! use multitake_core::timeline::{create_policy, CutPolicy, SegmentScheduler, SelectionStrategy};
//!
//! let policy = create_policy(SelectionStrategy::Random, seed, 0);
//! let mut scheduler = SegmentScheduler::new(policy);
//! let schedule = scheduler.schedule(&takes, reference_secs, 30.0, 30.0, &CutPolicy::fixed(5.0))?;
//! ```

pub mod availability;
pub mod cut_points;
mod errors;
pub mod scheduler;
pub mod selection;

pub use availability::{candidates, is_available};
pub use cut_points::{CutPoint, CutPolicy, DEFAULT_BEAT_LOOKAHEAD_SECS};
pub use errors::{ScheduleError, ScheduleResult};
pub use scheduler::{corrected_local_start, SchedulerState, SegmentScheduler};
pub use selection::{
    create_policy, FixedIndex, RandomSelection, RoundRobin, SelectionPolicy, SelectionStrategy,
};

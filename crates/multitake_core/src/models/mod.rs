//! Data models for MultiTake.
//!
//! - Recording identity (`RecordingId`)
//! - Loaded media (`Recording`, `ReferenceAudio`, `VideoInfo`)
//! - Alignment results (`Offset`, `AlignedTake`)
//! - Scheduler output (`Segment`, `Schedule`)
//! - Run input (`ProjectSpec`, `TakeSource`)

mod media;
mod offset;
mod project;
mod recording_id;
mod schedule;

pub use media::{AlignedTake, Recording, ReferenceAudio, VideoInfo};
pub use offset::Offset;
pub use project::{ProjectSpec, TakeSource};
pub use recording_id::RecordingId;
pub use schedule::{Schedule, Segment};

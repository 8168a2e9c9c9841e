//! Pipeline step implementations.

mod align;
mod probe;
mod render;
mod schedule;

pub use align::{load_beats_file, AlignStep};
pub use probe::ProbeStep;
pub use render::{pretrim_commands, RenderStep};
pub use schedule::ScheduleStep;

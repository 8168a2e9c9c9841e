//! MultiTake Core - audio-aligned multi-take auto-cutting.
//!
//! Aligns several takes of one performance against a reference track,
//! schedules cuts between them and renders the result. No CLI
//! dependencies; the binary crate only parses arguments and discovers
//! input files.

pub mod analysis;
pub mod cancel;
pub mod config;
pub mod geometry;
pub mod logging;
pub mod media;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod timeline;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}

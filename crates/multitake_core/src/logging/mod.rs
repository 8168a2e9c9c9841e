//! Logging infrastructure for MultiTake.
//!
//! - Per-run loggers with file + callback output
//! - Compact mode with progress filtering
//! - Tail buffer for error diagnosis
//! - Global `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use multitake_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("session", ".logs", LogConfig::default(), None).unwrap();
//! logger.phase("Align");
//! logger.command("ffmpeg -i take.mp4 ...");
//! logger.progress(50);
//! logger.finish(true);
//! ```

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`. Output goes to stderr so stdout
/// stays clean for `--dry-run` JSON.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

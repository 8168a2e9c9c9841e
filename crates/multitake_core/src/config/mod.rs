//! Configuration management for MultiTake.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use multitake_core::config::{ConfigManager, ConfigSection};
//! use multitake_core::timeline::SelectionStrategy;
//!
//! let mut config = ConfigManager::new(".config/multitake.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Cut every {}s", config.settings().timeline.step_secs);
//!
//! config.settings_mut().selection.policy = SelectionStrategy::RoundRobin;
//! config.update_section(ConfigSection::Selection).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnalysisSettings, ConfigSection, CutPolicyKind, LoggingSettings, OutputSettings,
    PathSettings, SelectionSettings, Settings, TimelineSettings,
};

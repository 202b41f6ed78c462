//! Utility module for animloop
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Small formatting helpers

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{AssetsConfig, Config, GeneralConfig, PlaybackConfig};
pub use error::{AnimloopError, Result};

/// Load the configuration, layering an explicit file over the defaults
/// and the system/user files.
pub fn load_config(explicit: Option<&std::path::Path>) -> Result<Config> {
    Config::load(explicit)
}

/// Format an elapsed duration for log lines
///
/// # Returns
///
/// Formatted string in the format "MM:SS.mmm"
pub fn format_elapsed(duration: std::time::Duration) -> String {
    let total_millis = duration.as_millis();
    let minutes = total_millis / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

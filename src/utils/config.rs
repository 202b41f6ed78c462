//! Configuration management for animloop
//!
//! This module handles loading and managing configuration
//! from config files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::utils::error::{AnimloopError, IntoAnimloopError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Asset discovery
    pub assets: AssetsConfig,

    /// Playback controller tuning
    pub playback: PlaybackConfig,

    /// General settings
    pub general: GeneralConfig,
}

/// Where animation files live and how they are published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory scanned for animation files
    pub directory: PathBuf,

    /// Public URL prefix the file names are joined onto
    pub url_prefix: String,

    /// File extension to match, without the dot
    pub extension: String,
}

/// Playback controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Quiet period before a burst of resize events re-measures the container
    pub resize_debounce_ms: u64,

    /// Fixed seed for asset selection (random when unset)
    pub seed: Option<u64>,
}

/// General configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("public/assets/animationen/autoplay"),
            url_prefix: "/assets/animationen/autoplay".to_string(),
            extension: "json".to_string(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            resize_debounce_ms: 100,
            seed: None,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl PlaybackConfig {
    /// Resize debounce as a duration
    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

/// Longest accepted resize debounce
const MAX_RESIZE_DEBOUNCE_MS: u64 = 10_000;

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. System config file (/etc/animloop/config.toml on Linux)
    /// 3. User config file (~/.config/animloop/config.toml on Linux)
    /// 4. The explicit file, if one is given
    /// 5. Environment variables (ANIMLOOP_* prefix)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(system_path) = Self::system_config_path() {
            if system_path.exists() {
                config.merge_from_file(&system_path)?;
            }
        }

        if let Some(user_path) = Self::user_config_path() {
            if user_path.exists() {
                config.merge_from_file(&user_path)?;
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(AnimloopError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            config.merge_from_file(path)?;
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Serialize as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).config_err("Failed to serialize config")
    }

    /// Merge configuration from a TOML file
    ///
    /// Keys present in the file override the current values; everything the
    /// file leaves out keeps what earlier layers set.
    fn merge_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = std::fs::read_to_string(path).config_err("Failed to read config file")?;
        let overlay: toml::Table =
            toml::from_str(&contents).config_err("Failed to parse config file")?;

        let mut merged = toml::Value::try_from(&*self).config_err("Failed to serialize config")?;
        merge_values(&mut merged, toml::Value::Table(overlay));
        *self = Config::deserialize(merged)
            .config_err(&format!("Invalid config file {}", path.display()))?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `ANIMLOOP_*` overrides looked up through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("ANIMLOOP_ASSETS_DIR") {
            self.assets.directory = PathBuf::from(dir);
        }

        if let Some(prefix) = lookup("ANIMLOOP_URL_PREFIX") {
            self.assets.url_prefix = prefix;
        }

        if let Some(ms) = lookup("ANIMLOOP_RESIZE_DEBOUNCE_MS") {
            self.playback.resize_debounce_ms = ms
                .parse()
                .map_err(|_| AnimloopError::Config("Invalid ANIMLOOP_RESIZE_DEBOUNCE_MS".to_string()))?;
        }

        if let Some(seed) = lookup("ANIMLOOP_SEED") {
            self.playback.seed = Some(
                seed.parse()
                    .map_err(|_| AnimloopError::Config("Invalid ANIMLOOP_SEED".to_string()))?,
            );
        }

        if let Some(log_level) = lookup("ANIMLOOP_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let extension = self.assets.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(AnimloopError::Config("Asset extension must not be empty".to_string()));
        }

        if self.playback.resize_debounce_ms > MAX_RESIZE_DEBOUNCE_MS {
            return Err(AnimloopError::Config(format!(
                "Resize debounce must be at most {}ms",
                MAX_RESIZE_DEBOUNCE_MS
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(AnimloopError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level, valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get system config file path
    fn system_config_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        return Some(PathBuf::from("/etc/animloop/config.toml"));

        #[cfg(target_os = "windows")]
        return std::env::var("PROGRAMDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("animloop").join("config.toml"));

        #[cfg(target_os = "macos")]
        return Some(PathBuf::from("/Library/Application Support/animloop/config.toml"));

        #[allow(unreachable_code)]
        None
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("animloop").join("config.toml"))
    }
}

/// Recursively overlay `overlay` onto `base`, table by table
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

//! Error types for animloop
//!
//! This module defines custom error types used throughout the crate.
//! We use thiserror for the library error type and anyhow for
//! application-level error handling in the binary.

use thiserror::Error;

/// Main error type for animloop
#[derive(Error, Debug)]
pub enum AnimloopError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Asset discovery errors
    #[error("Asset error: {0}")]
    Assets(String),

    /// The controller was asked to drive a player that does not exist
    #[error("Animation player element not found")]
    MissingPlayer,

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Results in animloop
pub type Result<T> = std::result::Result<T, AnimloopError>;

/// Extension trait for converting other errors to AnimloopError
pub trait IntoAnimloopError<T> {
    /// Convert this error into a configuration error with the given context
    fn config_err(self, context: &str) -> Result<T>;
    /// Convert this error into an asset error with the given context
    fn assets_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoAnimloopError<T> for std::result::Result<T, E> {
    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| AnimloopError::Config(format!("{}: {}", context, e)))
    }

    fn assets_err(self, context: &str) -> Result<T> {
        self.map_err(|e| AnimloopError::Assets(format!("{}: {}", context, e)))
    }
}

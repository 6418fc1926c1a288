//! # Playback Error Types
//!
//! Errors surfaced by savings tracking and session recording.

use core_settings::SettingsError;
use thiserror::Error;

/// Errors that can occur while tracking playback.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Persisting a flush or a session failed.
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Invalid tracker configuration.
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    /// The media source could not identify the loaded content.
    #[error("No content loaded")]
    NoContent,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if a later attempt may succeed (a tier may come back).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::Settings(SettingsError::NoWritableTier { .. })
                | PlaybackError::Settings(SettingsError::Backend(_))
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

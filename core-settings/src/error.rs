//! # Settings Error Types

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors surfaced by explicit settings actions.
///
/// Background reads and reconciliation never return these; they log and fall
/// back to defaults instead.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A storage tier failed.
    #[error("Storage backend error: {0}")]
    Backend(#[from] BridgeError),

    /// A persisted text value claims to be JSON but does not parse.
    #[error("Malformed persisted value for '{key}': {message}")]
    MalformedValue { key: String, message: String },

    /// An import snapshot failed validation; nothing was written.
    #[error("Invalid import snapshot: {0}")]
    InvalidSnapshot(String),

    /// A user-supplied value is out of range or of the wrong shape.
    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// No storage tier accepted the write.
    #[error("No storage tier accepted the write for '{key}'")]
    NoWritableTier { key: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SettingsError {
    pub(crate) fn invalid_value(key: &str, message: impl Into<String>) -> Self {
        SettingsError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

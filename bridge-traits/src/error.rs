use thiserror::Error;

use crate::storage::StorageTier;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Read from {tier} tier failed: {message}")]
    ReadFailed { tier: StorageTier, message: String },

    #[error("Write to {tier} tier failed: {message}")]
    WriteFailed { tier: StorageTier, message: String },

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the error means the capability is absent rather than broken.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BridgeError::NotAvailable(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

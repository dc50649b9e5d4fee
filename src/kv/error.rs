//! Error types for the KV store module.

use thiserror::Error;

/// Errors that can occur during KV store operations.
#[derive(Error, Debug)]
pub enum KvError {
    /// The backing medium could not be reached or refused the operation.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Store not initialized at {0}")]
    NotInitialized(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A stored value exists but cannot be decoded.
    #[error("Corrupted entry '{key}': {reason}")]
    Corrupted { key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl KvError {
    /// Build a [`KvError::StorageUnavailable`] from any displayable error.
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable(err.to_string())
    }

    /// Returns `true` if the backing medium could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

#[cfg(feature = "kv")]
impl From<fjall::Error> for KvError {
    fn from(err: fjall::Error) -> Self {
        Self::unavailable(err)
    }
}

impl From<std::io::Error> for KvError {
    fn from(err: std::io::Error) -> Self {
        Self::unavailable(err)
    }
}

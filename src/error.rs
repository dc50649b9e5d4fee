//! Unified error type for the student-kv library.
//!
//! This module provides a single [`Error`] type that encompasses all errors
//! that can occur in the library, making it easier to handle errors in
//! application code.

use thiserror::Error;

use crate::kv::KvError;
use crate::records::ValidationError;

/// Unified error type for all student-kv operations.
///
/// # Example
///
/// ```ignore
/// use student_kv::{Result, KvStore};
///
/// fn do_something() -> Result<()> {
///     let store = KvStore::open(Path::new(".student-kv"))?;
///     store.set("subject:1", &json!({"name": "OOP"}))?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Error from key-value store operations.
    #[error(transparent)]
    Kv(#[from] KvError),

    /// A document failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A [`Result`] type alias using the unified [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns `true` if this is a KV store error.
    pub fn is_kv(&self) -> bool {
        matches!(self, Self::Kv(_))
    }

    /// Returns `true` if the backing medium could not be reached.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::Kv(KvError::StorageUnavailable(_)))
    }

    /// Returns `true` if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

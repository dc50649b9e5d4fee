//! Data types for the KV store module.

use serde::{Deserialize, Serialize};

/// A stored document. The store treats it as opaque JSON.
pub type Document = serde_json::Value;

/// A live entry as seen by readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: Document,
    /// Starts at 1 and increments on every write to the key.
    pub version: u64,
}

/// Stored value envelope, wrapping the JSON payload with metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    /// Format version for future compatibility
    pub format: u8,

    /// Write counter for this key
    pub version: u64,

    /// Serialized JSON document
    pub payload: Vec<u8>,
}

impl StoredEntry {
    /// Current format version
    pub const CURRENT_FORMAT: u8 = 1;

    /// Serialize a document into a new envelope at the given version.
    pub fn new(version: u64, value: &Document) -> Result<Self, serde_json::Error> {
        Ok(Self {
            format: Self::CURRENT_FORMAT,
            version,
            payload: serde_json::to_vec(value)?,
        })
    }
}

/// One row of a bulk import.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportEntry {
    /// Explicit id. A fresh one is generated when absent or empty.
    #[serde(default)]
    pub id: Option<String>,
    pub document: Document,
}

impl ImportEntry {
    pub fn new(document: Document) -> Self {
        Self { id: None, document }
    }

    pub fn with_id(id: impl Into<String>, document: Document) -> Self {
        Self {
            id: Some(id.into()),
            document,
        }
    }
}

/// Outcome of a single import row.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Position of the row in the request.
    pub index: usize,
    pub key: String,
    /// New version on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-row results of [`KvStore::import_bulk`](super::KvStore::import_bulk).
///
/// Import is best-effort: every row is attempted once, in order, and a
/// failed row does not stop the rows after it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    /// Number of rows written.
    pub fn imported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Number of rows that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.imported()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// `true` when every row was written.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(ImportOutcome::is_ok)
    }

    /// Keys of the rows that were written, in request order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_ok())
            .map(|o| o.key.as_str())
    }
}

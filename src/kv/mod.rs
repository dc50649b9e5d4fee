//! Key-value store module for JSON documents.
//!
//! This module provides an ordered store mapping string keys to JSON
//! documents, with prefix scans, atomic multi-delete and best-effort bulk
//! import. Values are persisted in a checksummed envelope on top of a
//! pluggable [`Backend`].

mod backend;
mod error;
mod format;
mod keygen;
mod store;
mod types;

#[cfg(feature = "kv")]
pub use backend::FjallBackend;
pub use backend::{Backend, MemoryBackend};
pub use error::KvError;
pub use keygen::generate_id;
pub use store::KvStore;
pub use types::{Document, Entry, ImportEntry, ImportOutcome, ImportReport, StoredEntry};

//! Prefix-indexed JSON document store with bulk import/export.
//!
//! This library provides an ordered key-value store whose values are JSON
//! documents, plus the typed records and reports used by the student
//! management API built on top of it.
//!
//! # Quick Start
//!
//! ```ignore
//! use student_kv::prelude::*;
//!
//! // Initialize a persistent store
//! let store = KvStore::init(Path::new(".student-kv"))?;
//!
//! // Keys are opaque; prefixes group documents into collections
//! store.set("subject:1", &json!({"name": "OOP", "code": "CS301"}))?;
//! let subjects = store.get_by_prefix("subject:")?;
//! ```
//!
//! # Modules
//!
//! - [`kv`] - Key-value store, backends and key generation
//! - [`records`] - Student and subject documents with validation
//! - [`report`] - Grade sheets and dashboard statistics
//! - [`server`] - HTTP API server (requires `server` feature)
//!
//! # Feature Flags
//!
//! - `kv` - Enable the persistent fjall backend (enabled by default)
//! - `logging` - Enable library-level tracing (consumers provide their own subscriber)
//! - `cli` - Enable the command-line interface binary
//! - `server` - Enable the HTTP API server
//! - `full` - Enable all features

pub mod kv;
mod logging;
pub mod prelude;
pub mod records;
pub mod report;
#[cfg(feature = "server")]
pub mod server;

mod error;

// Re-export the unified error type
pub use error::{Error, Result};

// Re-export KV types at crate root for convenience
#[cfg(feature = "kv")]
pub use kv::FjallBackend;
pub use kv::{
    generate_id, Backend, Document, Entry, ImportEntry, ImportOutcome, ImportReport, KvError,
    KvStore, MemoryBackend,
};

pub use records::{Collection, Dataset, Record, Student, StudentSubject, Subject, ValidationError};
pub use report::{grade_for, DashboardStats, GradeSheet};

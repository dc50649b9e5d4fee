//! Convenient re-exports for common usage patterns.
//!
//! # Example
//!
//! ```ignore
//! use student_kv::prelude::*;
//!
//! let store = KvStore::in_memory();
//! let report = store.import_bulk("subject:", vec![ImportEntry::new(json!({"name": "A"}))])?;
//! assert!(report.is_complete());
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// KV store types
#[cfg(feature = "kv")]
pub use crate::kv::FjallBackend;
pub use crate::kv::{
    generate_id, Backend, Document, Entry, ImportEntry, ImportReport, KvError, KvStore,
    MemoryBackend,
};

// Records and reports
pub use crate::records::{
    Collection, Dataset, NewStudent, NewSubject, Record, Student, StudentPatch, StudentSubject,
    Subject, SubjectPatch, ValidationError,
};
pub use crate::report::{grade_for, DashboardStats, GradeSheet};

// Dependency re-exports
pub use serde_json::json;
pub use std::path::Path;

//! Document store over an ordered [`Backend`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[cfg(feature = "kv")]
use std::path::Path;

use crate::logging::{debug, error, info, trace, warn};

use super::backend::{Backend, MemoryBackend};
use super::error::KvError;
use super::keygen::generate_id;
use super::types::{Document, Entry, ImportEntry, ImportOutcome, ImportReport, StoredEntry};

/// A prefix-queryable key-value store of JSON documents.
///
/// Keys are opaque strings. Collections are emulated with key prefixes
/// (`"student:"`, `"subject:"`), which the store does not interpret.
///
/// # Example
///
/// ```ignore
/// use student_kv::KvStore;
///
/// let store = KvStore::in_memory();
/// store.set("subject:1", &json!({"name": "OOP", "code": "CS301"}))?;
/// assert_eq!(store.get_by_prefix("subject:")?.len(), 1);
///
/// store.del("subject:1")?;
/// assert!(store.get_by_prefix("subject:")?.is_empty());
/// ```
///
/// # Consistency
///
/// Writes are last-write-wins per key with no conflict detection. The
/// version counter is read-modify-write, so two concurrent writers of the
/// same key may both store the same version; only the value of the last
/// committed write survives. Writers of different keys never block each
/// other.
///
/// # Failures
///
/// Every operation makes one attempt against the backend. An unreachable
/// medium is returned as [`KvError::StorageUnavailable`]; it is never
/// reported as a missing key or an empty scan.
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").finish_non_exhaustive()
    }
}

impl KvStore {
    /// Wrap a custom backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Create an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    /// Open an existing persistent store at the given path.
    #[cfg(feature = "kv")]
    pub fn open(path: &Path) -> Result<Self, KvError> {
        Ok(Self::with_backend(Arc::new(super::FjallBackend::open(path)?)))
    }

    /// Initialize a persistent store at the given path.
    #[cfg(feature = "kv")]
    pub fn init(path: &Path) -> Result<Self, KvError> {
        Ok(Self::with_backend(Arc::new(super::FjallBackend::init(path)?)))
    }

    /// Open the store at `path`, initializing it first if the directory is absent.
    #[cfg(feature = "kv")]
    pub fn open_or_init(path: &Path) -> Result<Self, KvError> {
        if path.exists() {
            Self::open(path)
        } else {
            Self::init(path)
        }
    }

    /// Get the current document for a key.
    pub fn get(&self, key: &str) -> Result<Option<Document>, KvError> {
        Ok(self.get_entry(key)?.map(|entry| entry.value))
    }

    /// Get the current entry for a key, including its version.
    pub fn get_entry(&self, key: &str) -> Result<Option<Entry>, KvError> {
        trace!(key = key, "get");
        let Some(bytes) = self.backend.get(key).map_err(log_failure("get"))? else {
            return Ok(None);
        };
        let entry = StoredEntry::decode(key, &bytes)?.into_entry(key.to_string())?;
        Ok(Some(entry))
    }

    /// Insert or replace the document at `key`. Returns the new version.
    ///
    /// Writing the same value twice leaves the same document in place;
    /// only the version advances.
    pub fn set(&self, key: &str, value: &Document) -> Result<u64, KvError> {
        let previous = match self.backend.get(key).map_err(log_failure("set"))? {
            Some(bytes) => match StoredEntry::decode(key, &bytes) {
                Ok(stored) => stored.version,
                Err(_err) => {
                    warn!(key = key, error = %_err, "overwriting unreadable entry");
                    0
                }
            },
            None => 0,
        };
        let version = previous.saturating_add(1);

        let stored = StoredEntry::new(version, value)?;
        self.backend
            .put(key, &stored.encode())
            .map_err(log_failure("set"))?;

        trace!(key = key, version = version, "set");
        Ok(version)
    }

    /// Remove a key. Returns whether it existed; a missing key is not an error.
    pub fn del(&self, key: &str) -> Result<bool, KvError> {
        let existed = self.backend.remove(key).map_err(log_failure("del"))?;
        trace!(key = key, existed = existed, "del");
        Ok(existed)
    }

    /// Remove every listed key, all or nothing.
    ///
    /// On success every key is absent afterwards and the number of keys that
    /// existed is returned. On error no key was removed.
    pub fn mdel<S: AsRef<str>>(&self, keys: &[S]) -> Result<usize, KvError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = keys
            .iter()
            .map(|k| k.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let removed = self
            .backend
            .remove_batch(&keys)
            .map_err(log_failure("mdel"))?;
        debug!(requested = keys.len(), removed = removed, "mdel");
        Ok(removed)
    }

    /// Documents whose key starts with `prefix`, ordered by key.
    ///
    /// The order is byte order of the keys, so repeated calls against the
    /// same state return the same sequence.
    pub fn get_by_prefix(&self, prefix: &str) -> Result<Vec<Document>, KvError> {
        Ok(self
            .entries_by_prefix(prefix)?
            .into_iter()
            .map(|entry| entry.value)
            .collect())
    }

    /// Entries whose key starts with `prefix`, ordered by key.
    pub fn entries_by_prefix(&self, prefix: &str) -> Result<Vec<Entry>, KvError> {
        let raw = self
            .backend
            .scan_prefix(prefix)
            .map_err(log_failure("scan"))?;
        let entries = raw
            .into_iter()
            .map(|(key, bytes)| StoredEntry::decode(&key, &bytes)?.into_entry(key))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(prefix = prefix, count = entries.len(), "prefix scan");
        Ok(entries)
    }

    /// Keys starting with `prefix`, ordered.
    pub fn keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        self.backend
            .scan_keys(prefix)
            .map_err(log_failure("scan"))
    }

    /// Number of live keys starting with `prefix`.
    pub fn count_by_prefix(&self, prefix: &str) -> Result<usize, KvError> {
        Ok(self.keys_by_prefix(prefix)?.len())
    }

    /// Write a batch of documents under `prefix`, in order.
    ///
    /// Each row's key is `prefix + id`; rows without an id (or with an empty
    /// one) get a generated id. When a document is a JSON object its `"id"`
    /// field is set to the id it was stored under.
    ///
    /// The import is best-effort: every row is attempted exactly once and a
    /// failed row does not stop later rows or roll back earlier ones. The
    /// returned report tells which rows were written.
    pub fn import_bulk<I>(&self, prefix: &str, entries: I) -> Result<ImportReport, KvError>
    where
        I: IntoIterator<Item = ImportEntry>,
    {
        let mut report = ImportReport::default();

        for (index, entry) in entries.into_iter().enumerate() {
            let id = match entry.id {
                Some(id) if !id.is_empty() => id,
                _ => generate_id(),
            };
            let key = format!("{}{}", prefix, id);

            let mut document = entry.document;
            if let Some(object) = document.as_object_mut() {
                object.insert("id".to_string(), Document::String(id));
            }

            let outcome = match self.set(&key, &document) {
                Ok(version) => ImportOutcome {
                    index,
                    key,
                    version: Some(version),
                    error: None,
                },
                Err(e) => {
                    warn!(key = %key, index = index, error = %e, "import row failed");
                    ImportOutcome {
                        index,
                        key,
                        version: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        info!(
            prefix = prefix,
            imported = report.imported(),
            failed = report.failed(),
            "bulk import"
        );
        Ok(report)
    }

    /// Documents for each prefix.
    pub fn export_all<S: AsRef<str>>(
        &self,
        prefixes: &[S],
    ) -> Result<BTreeMap<String, Vec<Document>>, KvError> {
        prefixes
            .iter()
            .map(|p| {
                let prefix = p.as_ref();
                Ok((prefix.to_string(), self.get_by_prefix(prefix)?))
            })
            .collect()
    }

    /// Delete every entry under each prefix. Returns the total removed.
    ///
    /// Each prefix is cleared with one atomic [`mdel`](Self::mdel). If a
    /// later prefix fails, earlier prefixes stay cleared.
    pub fn clear<S: AsRef<str>>(&self, prefixes: &[S]) -> Result<usize, KvError> {
        let mut total = 0;
        for p in prefixes {
            let prefix = p.as_ref();
            let keys = self.keys_by_prefix(prefix)?;
            let removed = self.mdel(&keys)?;
            info!(prefix = prefix, removed = removed, "cleared prefix");
            total += removed;
        }
        Ok(total)
    }
}

/// Log a backend failure before it propagates.
fn log_failure(_op: &'static str) -> impl Fn(KvError) -> KvError {
    move |e| {
        error!(op = _op, error = %e, "backend operation failed");
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A backend whose medium is always down.
    struct DownBackend;

    impl Backend for DownBackend {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, KvError> {
            Err(KvError::unavailable("connection refused"))
        }
        fn put(&self, _key: &str, _value: &[u8]) -> Result<(), KvError> {
            Err(KvError::unavailable("connection refused"))
        }
        fn remove(&self, _key: &str) -> Result<bool, KvError> {
            Err(KvError::unavailable("connection refused"))
        }
        fn remove_batch(&self, _keys: &[String]) -> Result<usize, KvError> {
            Err(KvError::unavailable("connection refused"))
        }
        fn scan_prefix(&self, _prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
            Err(KvError::unavailable("connection refused"))
        }
    }

    /// Accepts writes until a fixed number have happened, then goes down.
    struct FlakyBackend {
        inner: MemoryBackend,
        writes_left: parking_lot::Mutex<usize>,
    }

    impl FlakyBackend {
        fn new(writes: usize) -> Self {
            Self {
                inner: MemoryBackend::new(),
                writes_left: parking_lot::Mutex::new(writes),
            }
        }
    }

    impl Backend for FlakyBackend {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
            self.inner.get(key)
        }
        fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
            let mut left = self.writes_left.lock();
            if *left == 0 {
                return Err(KvError::unavailable("disk full"));
            }
            *left -= 1;
            self.inner.put(key, value)
        }
        fn remove(&self, key: &str) -> Result<bool, KvError> {
            self.inner.remove(key)
        }
        fn remove_batch(&self, _keys: &[String]) -> Result<usize, KvError> {
            Err(KvError::unavailable("disk full"))
        }
        fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
            self.inner.scan_prefix(prefix)
        }
    }

    #[test]
    fn test_set_then_get() {
        let store = KvStore::in_memory();
        let doc = json!({"name": "OOP", "code": "CS301", "credits": 4, "semester": 3});
        store.set("subject:1", &doc).unwrap();
        assert_eq!(store.get("subject:1").unwrap(), Some(doc));
        assert_eq!(store.get("subject:2").unwrap(), None);
    }

    #[test]
    fn test_versions_increment() {
        let store = KvStore::in_memory();
        assert_eq!(store.set("k", &json!(1)).unwrap(), 1);
        assert_eq!(store.set("k", &json!(1)).unwrap(), 2);
        assert_eq!(store.set("k", &json!(2)).unwrap(), 3);

        let entry = store.get_entry("k").unwrap().unwrap();
        assert_eq!(entry.version, 3);
        assert_eq!(entry.value, json!(2));

        store.del("k").unwrap();
        assert_eq!(store.set("k", &json!(3)).unwrap(), 1);
    }

    #[test]
    fn test_retried_set_is_idempotent() {
        let store = KvStore::in_memory();
        let doc = json!({"name": "A"});
        store.set("subject:a", &doc).unwrap();
        store.set("subject:a", &doc).unwrap();
        assert_eq!(store.get_by_prefix("subject:").unwrap(), vec![doc]);
    }

    #[test]
    fn test_del_missing_is_noop() {
        let store = KvStore::in_memory();
        store.set("student:1", &json!({"name": "Ann"})).unwrap();
        assert!(store.del("student:1").unwrap());
        assert_eq!(store.get("student:1").unwrap(), None);
        assert!(!store.del("student:1").unwrap());
    }

    #[test]
    fn test_subject_lifecycle() {
        let store = KvStore::in_memory();
        store
            .set(
                "subject:1",
                &json!({"name": "OOP", "code": "CS301", "credits": 4, "semester": 3}),
            )
            .unwrap();

        let subjects = store.get_by_prefix("subject:").unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0]["name"], "OOP");

        store.del("subject:1").unwrap();
        assert!(store.get_by_prefix("subject:").unwrap().is_empty());
    }

    #[test]
    fn test_prefix_scan_is_exact_and_ordered() {
        let store = KvStore::in_memory();
        for key in ["student:b", "subject:x", "student:a", "studentx", "student:"] {
            store.set(key, &json!(key)).unwrap();
        }

        let keys: Vec<String> = store
            .entries_by_prefix("student:")
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["student:", "student:a", "student:b"]);
        assert_eq!(
            store.get_by_prefix("student:").unwrap(),
            store.get_by_prefix("student:").unwrap()
        );
        assert!(store.get_by_prefix("staff:").unwrap().is_empty());
    }

    #[test]
    fn test_mdel_removes_all_listed() {
        let store = KvStore::in_memory();
        for i in 0..5 {
            store.set(&format!("student:{}", i), &json!(i)).unwrap();
        }
        let removed = store
            .mdel(&["student:0", "student:1", "student:1", "student:9"])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count_by_prefix("student:").unwrap(), 3);
        assert_eq!(store.mdel::<&str>(&[]).unwrap(), 0);
    }

    #[test]
    fn test_mdel_failure_removes_nothing() {
        let store = KvStore::with_backend(Arc::new(FlakyBackend::new(10)));
        store.set("student:1", &json!(1)).unwrap();
        store.set("student:2", &json!(2)).unwrap();

        let err = store.mdel(&["student:1", "student:2"]).unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(store.count_by_prefix("student:").unwrap(), 2);
    }

    #[test]
    fn test_import_generates_distinct_keys() {
        let store = KvStore::in_memory();
        store.set("subject:existing", &json!({"name": "Z"})).unwrap();
        let before = store.count_by_prefix("subject:").unwrap();

        let report = store
            .import_bulk(
                "subject:",
                vec![
                    ImportEntry::new(json!({"name": "A"})),
                    ImportEntry::new(json!({"name": "B"})),
                ],
            )
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.imported(), 2);
        let keys: Vec<&str> = report.keys().collect();
        assert_ne!(keys[0], keys[1]);
        for key in &keys {
            assert!(key.starts_with("subject:"));
            let doc = store.get(key).unwrap().unwrap();
            assert_eq!(
                format!("subject:{}", doc["id"].as_str().unwrap()),
                key.to_string()
            );
        }
        assert_eq!(store.count_by_prefix("subject:").unwrap(), before + 2);
    }

    #[test]
    fn test_import_keeps_explicit_ids() {
        let store = KvStore::in_memory();
        let report = store
            .import_bulk(
                "student:",
                vec![
                    ImportEntry::with_id("42", json!({"name": "Ann", "id": "ignored"})),
                    ImportEntry::with_id("", json!({"name": "Bob"})),
                ],
            )
            .unwrap();
        assert_eq!(report.outcomes[0].key, "student:42");
        assert_eq!(store.get("student:42").unwrap().unwrap()["id"], "42");
        assert_ne!(report.outcomes[1].key, "student:");
    }

    #[test]
    fn test_import_reports_partial_failure() {
        let store = KvStore::with_backend(Arc::new(FlakyBackend::new(2)));
        let rows = (0..4).map(|i| ImportEntry::with_id(i.to_string(), json!({"n": i})));
        let report = store.import_bulk("subject:", rows).unwrap();

        assert_eq!(report.total(), 4);
        assert_eq!(report.imported(), 2);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_complete());
        assert!(report.outcomes[0].is_ok());
        assert!(report.outcomes[1].is_ok());
        assert!(report.outcomes[2].error.as_deref().unwrap().contains("disk full"));
        assert_eq!(store.count_by_prefix("subject:").unwrap(), 2);
    }

    #[test]
    fn test_import_same_key_last_write_wins() {
        let store = KvStore::in_memory();
        let report = store
            .import_bulk(
                "subject:",
                vec![
                    ImportEntry::with_id("1", json!({"name": "first"})),
                    ImportEntry::with_id("1", json!({"name": "second"})),
                ],
            )
            .unwrap();
        assert_eq!(report.outcomes[1].version, Some(2));
        assert_eq!(store.get("subject:1").unwrap().unwrap()["name"], "second");
    }

    #[test]
    fn test_export_all() {
        let store = KvStore::in_memory();
        store.set("student:1", &json!({"name": "Ann"})).unwrap();
        store.set("subject:1", &json!({"name": "OOP"})).unwrap();
        store.set("subject:2", &json!({"name": "OS"})).unwrap();

        let export = store.export_all(&["student:", "subject:", "other:"]).unwrap();
        assert_eq!(export["student:"].len(), 1);
        assert_eq!(export["subject:"].len(), 2);
        assert!(export["other:"].is_empty());
    }

    #[test]
    fn test_clear_leaves_other_prefixes() {
        let store = KvStore::in_memory();
        for i in 0..3 {
            store.set(&format!("student:{}", i), &json!(i)).unwrap();
        }
        store.set("subject:1", &json!({"name": "OOP"})).unwrap();

        assert_eq!(store.clear(&["student:"]).unwrap(), 3);
        assert!(store.get_by_prefix("student:").unwrap().is_empty());
        assert_eq!(store.get_by_prefix("subject:").unwrap().len(), 1);
        assert_eq!(store.clear(&["student:"]).unwrap(), 0);
    }

    #[test]
    fn test_unavailable_is_never_empty() {
        let store = KvStore::with_backend(Arc::new(DownBackend));
        assert!(store.get("k").unwrap_err().is_unavailable());
        assert!(store.set("k", &json!(1)).unwrap_err().is_unavailable());
        assert!(store.del("k").unwrap_err().is_unavailable());
        assert!(store.mdel(&["k"]).unwrap_err().is_unavailable());
        assert!(store.get_by_prefix("").unwrap_err().is_unavailable());
        assert!(store.export_all(&["student:"]).unwrap_err().is_unavailable());
        assert!(store.clear(&["student:"]).unwrap_err().is_unavailable());
    }

    #[test]
    fn test_import_on_down_backend_reports_every_row() {
        let store = KvStore::with_backend(Arc::new(DownBackend));
        let report = store
            .import_bulk("subject:", vec![ImportEntry::new(json!({"name": "A"}))])
            .unwrap();
        assert_eq!(report.imported(), 0);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_corrupted_entry_is_an_error() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("subject:bad", b"garbage").unwrap();
        let store = KvStore::with_backend(backend);

        assert!(matches!(
            store.get("subject:bad"),
            Err(KvError::Corrupted { .. })
        ));
        assert!(store.get_by_prefix("subject:").is_err());
        // A write replaces the unreadable value.
        assert_eq!(store.set("subject:bad", &json!({"name": "ok"})).unwrap(), 1);
        assert!(store.get("subject:bad").unwrap().is_some());
    }

    #[test]
    fn test_overwritten_corrupted_entry_counts_versions_again() {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("student:bad", &[0u8; 3]).unwrap();
        let store = KvStore::with_backend(backend);

        assert_eq!(store.set("student:bad", &json!({"n": 1})).unwrap(), 1);
        assert_eq!(store.set("student:bad", &json!({"n": 2})).unwrap(), 2);
        let entry = store.get_entry("student:bad").unwrap().unwrap();
        assert_eq!(entry.value, json!({"n": 2}));
        assert_eq!(entry.version, 2);
    }

    #[cfg(feature = "kv")]
    #[test]
    fn test_persistent_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("db");
        {
            let store = KvStore::open_or_init(&path).unwrap();
            store.set("subject:1", &json!({"name": "OOP"})).unwrap();
            store.set("subject:1", &json!({"name": "OOP II"})).unwrap();
        }
        let store = KvStore::open_or_init(&path).unwrap();
        let entry = store.get_entry("subject:1").unwrap().unwrap();
        assert_eq!(entry.value["name"], "OOP II");
        assert_eq!(entry.version, 2);
    }

    #[test]
    fn test_concurrent_writers_distinct_keys() {
        let store = KvStore::in_memory();
        std::thread::scope(|s| {
            for t in 0..4 {
                let store = store.clone();
                s.spawn(move || {
                    for i in 0..50 {
                        store
                            .set(&format!("student:{}-{}", t, i), &json!(i))
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(store.count_by_prefix("student:").unwrap(), 200);
    }
}

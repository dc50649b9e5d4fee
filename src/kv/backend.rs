//! Ordered byte stores that a [`KvStore`](super::KvStore) runs on.
//!
//! Both backends keep keys in byte order, so a prefix scan is a range scan
//! starting at the prefix and stopping at the first key that no longer
//! matches.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::error::KvError;

/// An ordered mapping from string keys to raw bytes.
///
/// Implementations must report an unreachable medium as
/// [`KvError::StorageUnavailable`] and never as an absent key or an empty
/// scan.
pub trait Backend: Send + Sync {
    /// Read the raw value for a key.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Insert or replace a value.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Remove a key. Returns whether it existed.
    fn remove(&self, key: &str) -> Result<bool, KvError>;

    /// Remove all keys atomically: either every key is gone afterwards or,
    /// on error, none was removed. Returns how many of them existed.
    fn remove_batch(&self, keys: &[String]) -> Result<usize, KvError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KvError>;

    /// Keys starting with `prefix`, in key order.
    fn scan_keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        Ok(self
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }
}

/// Ephemeral backend for tests and throwaway servers.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        self.map.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.map.write().remove(key).is_some())
    }

    fn remove_batch(&self, keys: &[String]) -> Result<usize, KvError> {
        let mut map = self.map.write();
        Ok(keys.iter().filter(|k| map.remove(k.as_str()).is_some()).count())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
        let map = self.map.read();
        Ok(map
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(feature = "kv")]
pub use fjall_backend::FjallBackend;

#[cfg(feature = "kv")]
mod fjall_backend {
    use std::path::Path;

    use fjall::{Keyspace, KeyspaceCreateOptions, PersistMode};

    use super::Backend;
    use crate::kv::error::KvError;
    use crate::logging::{debug, info};

    /// Keyspace holding store metadata.
    const META_KEYSPACE: &str = "_meta";
    const META_CONFIG_KEY: &str = "config";

    /// Keyspace holding the documents.
    const DATA_KEYSPACE: &str = "documents";

    /// Current on-disk layout version.
    /// The store refuses to open a directory written with a different one.
    const STORE_VERSION: u32 = 1;

    /// Persistent backend on a fjall LSM tree.
    ///
    /// Every write is persisted with [`PersistMode::SyncAll`] before it
    /// returns. Any fjall or I/O failure surfaces as
    /// [`KvError::StorageUnavailable`].
    pub struct FjallBackend {
        db: fjall::Database,
        data: Keyspace,
    }

    impl FjallBackend {
        /// Open an existing store at the given path.
        pub fn open(path: &Path) -> Result<Self, KvError> {
            if !path.exists() {
                return Err(KvError::NotInitialized(path.display().to_string()));
            }

            let db = fjall::Database::builder(path).open()?;
            let meta = db.keyspace(META_KEYSPACE, KeyspaceCreateOptions::default)?;

            let Some(config) = meta.get(META_CONFIG_KEY)? else {
                return Err(KvError::NotInitialized(path.display().to_string()));
            };
            let version = u32::from_le_bytes(
                config
                    .as_ref()
                    .try_into()
                    .map_err(|_| KvError::InvalidFormat("Invalid config format".to_string()))?,
            );
            if version != STORE_VERSION {
                return Err(KvError::InvalidFormat(format!(
                    "Store version mismatch: expected {}, got {}",
                    STORE_VERSION, version
                )));
            }

            let data = db.keyspace(DATA_KEYSPACE, KeyspaceCreateOptions::default)?;
            info!(path = %path.display(), "opened store");
            Ok(Self { db, data })
        }

        /// Initialize a store at the given path, creating the directory if needed.
        pub fn init(path: &Path) -> Result<Self, KvError> {
            let db = fjall::Database::builder(path).open()?;
            let meta = db.keyspace(META_KEYSPACE, KeyspaceCreateOptions::default)?;
            meta.insert(META_CONFIG_KEY, STORE_VERSION.to_le_bytes())?;
            let data = db.keyspace(DATA_KEYSPACE, KeyspaceCreateOptions::default)?;
            db.persist(PersistMode::SyncAll)?;

            info!(path = %path.display(), "initialized store");
            Ok(Self { db, data })
        }

        fn persist(&self) -> Result<(), KvError> {
            self.db.persist(PersistMode::SyncAll)?;
            Ok(())
        }
    }

    impl Backend for FjallBackend {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
            Ok(self.data.get(key)?.map(|v| v.to_vec()))
        }

        fn put(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
            self.data.insert(key, value)?;
            self.persist()
        }

        fn remove(&self, key: &str) -> Result<bool, KvError> {
            let existed = self.data.contains_key(key)?;
            if existed {
                self.data.remove(key)?;
                self.persist()?;
            }
            Ok(existed)
        }

        fn remove_batch(&self, keys: &[String]) -> Result<usize, KvError> {
            let mut existing = 0;
            let mut batch = self.db.batch();
            for key in keys {
                if self.data.contains_key(key.as_str())? {
                    existing += 1;
                }
                batch.remove(&self.data, key.as_str());
            }
            batch.commit()?;
            self.persist()?;
            debug!(requested = keys.len(), existing = existing, "batch removed");
            Ok(existing)
        }

        fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KvError> {
            let mut entries = Vec::new();
            for kv in self.data.prefix(prefix) {
                let (key, value) = kv.into_inner()?;
                let key = String::from_utf8(key.to_vec()).map_err(|e| KvError::Corrupted {
                    key: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                    reason: "key is not valid UTF-8".to_string(),
                })?;
                entries.push((key, value.to_vec()));
            }
            Ok(entries)
        }
    }
}

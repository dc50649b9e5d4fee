//! Application state management.

use thiserror::Error;

use crate::kv::{KvError, KvStore};
use crate::logging::info;

use super::config::{BackendKind, Config};

/// Shared application state. The store handle is owned here and handed to
/// every handler; there is no global store.
#[derive(Clone, Debug)]
pub struct AppState {
    store: KvStore,
}

impl AppState {
    /// Create state around an already opened store.
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Open the store described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let store = match config.store.backend {
            BackendKind::Memory => {
                info!("using in-memory store");
                KvStore::in_memory()
            }
            BackendKind::Fjall => {
                KvStore::open_or_init(&config.store.path).map_err(|source| StateError::Open {
                    path: config.store.path.display().to_string(),
                    source,
                })?
            }
        };
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }
}

/// Errors that can occur when setting up application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Failed to open store at '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: KvError,
    },
}

//! Common test utilities and fixtures.
//!
//! This module provides the test application harness and request fixtures
//! shared by the HTTP integration tests.

#![cfg(feature = "server")]
#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;
use student_kv::server::{router, AppState, BackendKind, Config, StoreConfig};
use student_kv::{Backend, KvStore};

// =============================================================================
// Test Application
// =============================================================================

/// Test application wrapper that manages a temporary store.
pub struct TestApp {
    pub server: TestServer,
    _temp_dir: Option<TempDir>, // Keep alive for test duration
}

impl TestApp {
    /// Create a new test application backed by a fresh fjall store.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let config = Config {
            store: StoreConfig {
                backend: BackendKind::Fjall,
                path: temp_dir.path().join("db"),
            },
            ..Config::default()
        };
        let state = AppState::from_config(&config)?;
        let server = TestServer::new(router(state))?;
        Ok(Self {
            server,
            _temp_dir: Some(temp_dir),
        })
    }

    /// Create a test application over the in-memory backend.
    pub fn in_memory() -> anyhow::Result<Self> {
        let state = AppState::from_config(&Config::in_memory())?;
        let server = TestServer::new(router(state))?;
        Ok(Self {
            server,
            _temp_dir: None,
        })
    }

    /// Create a test application over a custom backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> anyhow::Result<Self> {
        let state = AppState::new(KvStore::with_backend(backend));
        let server = TestServer::new(router(state))?;
        Ok(Self {
            server,
            _temp_dir: None,
        })
    }

    /// Create a student and return the stored document.
    pub async fn create_student(&self, body: Value) -> anyhow::Result<Value> {
        let response = self.server.post("/students").json(&body).await;
        response.assert_status_ok();
        let envelope: Value = response.json();
        Ok(envelope["data"].clone())
    }

    /// Create a subject and return the stored document.
    pub async fn create_subject(&self, body: Value) -> anyhow::Result<Value> {
        let response = self.server.post("/subjects").json(&body).await;
        response.assert_status_ok();
        let envelope: Value = response.json();
        Ok(envelope["data"].clone())
    }

    /// GET a path and return the `data` field of the envelope.
    pub async fn get_data(&self, path: &str) -> Value {
        let response = self.server.get(path).await;
        response.assert_status_ok();
        let envelope: Value = response.json();
        envelope["data"].clone()
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A valid student creation payload.
pub fn student_json(name: &str, roll: &str) -> Value {
    json!({
        "name": name,
        "email": format!("{}@example.edu", roll.to_lowercase()),
        "rollNumber": roll,
        "department": "Computer Science",
        "semester": 3,
        "year": 2
    })
}

/// A valid subject creation payload.
pub fn subject_json(name: &str, code: &str) -> Value {
    json!({
        "name": name,
        "code": code,
        "credits": 4,
        "semester": 3
    })
}

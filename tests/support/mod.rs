//! Shared test fixtures

#![allow(dead_code)]

use hotzenplotz::{
    CacheConfig, CacheError, DurableStore, MemoryStore, Result, Transport, TransportResponse,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

pub const BASE_URL: &str = "http://backend.test/api";

/// Scripted transport recording every requested path
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, (u16, String)>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for collection `name`
    pub fn serve(&self, name: &str, body: Value) {
        self.respond(name, 200, body.to_string());
    }

    pub fn respond(&self, name: &str, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(path(name), (status, body.into()));
    }

    /// Serve a `system` collection at `revision`
    pub fn serve_revision(&self, revision: u64) {
        self.serve("system", system_body(revision));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, name: &str) -> usize {
        let path = path(name);
        self.calls.lock().unwrap().iter().filter(|p| **p == path).count()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn fetch(&self, path: &str) -> Result<TransportResponse> {
        self.calls.lock().unwrap().push(path.to_string());
        let response = self.responses.lock().unwrap().get(path).cloned();

        // Suspend like a real network call would
        tokio::task::yield_now().await;

        let (status, body) = response.unwrap_or((404, "Not Found".to_string()));
        Ok(TransportResponse::ready(status, body))
    }
}

pub fn path(name: &str) -> String {
    format!("{}/{}.json", BASE_URL, name)
}

pub fn system_body(revision: u64) -> Value {
    json!([{"_id": {"$oid": "sys"}, "type": "config", "revision": revision}])
}

pub fn users_body() -> Value {
    json!([
        {"_id": {"$oid": "u1"}, "name": "Kasperl"},
        {"_id": {"$oid": "u2"}, "name": "Seppel"}
    ])
}

pub fn persistent_config() -> CacheConfig {
    CacheConfig {
        persist_locally: true,
        ..CacheConfig::with_backend(BASE_URL)
    }
}

/// Store that refuses writes to one key and delegates everything else
pub struct FailingStore {
    inner: MemoryStore,
    failing_key: String,
}

impl FailingStore {
    pub fn failing_on(key: impl Into<String>) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_key: key.into(),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

impl DurableStore for FailingStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if key == self.failing_key {
            return Err(CacheError::Storage(format!("disk full writing {}", key)));
        }
        self.inner.write(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}

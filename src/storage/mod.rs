//! Durable storage for collections
//!
//! Persisted layout:
//! - `hotzenplotz` holds the registry, a JSON array of persisted collection names
//! - `hotzenplotz_<name>` holds the normalized items of one collection
//!
//! Durable storage is advisory. Unreadable entries are treated as absent.

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::error::Result;
use crate::types::Item;
use std::sync::Arc;
use tracing::warn;

/// Key prefix shared by every persisted entry
pub const STORAGE_PREFIX: &str = "hotzenplotz";

/// String key-value store the cache persists into
pub trait DurableStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// Key under which a collection's items are stored
pub fn collection_key(name: &str) -> String {
    format!("{}_{}", STORAGE_PREFIX, name)
}

/// Namespacing layer between the cache and a [`DurableStore`]
#[derive(Clone)]
pub struct CollectionStorage {
    store: Arc<dyn DurableStore>,
}

impl CollectionStorage {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Names listed in the registry
    ///
    /// A missing or unparsable registry yields an empty list.
    pub fn registry(&self) -> Vec<String> {
        let raw = match self.store.read(STORAGE_PREFIX) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read collection registry");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed collection registry");
                Vec::new()
            }
        }
    }

    /// Overwrite the registry
    pub fn write_registry(&self, names: &[String]) -> Result<()> {
        let value = serde_json::to_string(names)?;
        self.store.write(STORAGE_PREFIX, &value)
    }

    /// Load one collection, `None` when absent or unreadable
    pub fn load(&self, name: &str) -> Option<Vec<Item>> {
        let raw = match self.store.read(&collection_key(name)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(collection = name, error = %e, "Failed to read persisted collection");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(items) => Some(items),
            Err(e) => {
                warn!(collection = name, error = %e, "Ignoring malformed persisted collection");
                None
            }
        }
    }

    /// Persist one collection's items
    pub fn save(&self, name: &str, items: &[Item]) -> Result<()> {
        let value = serde_json::to_string(items)?;
        self.store.write(&collection_key(name), &value)
    }

    /// Drop one collection's items (the registry is left alone)
    pub fn remove(&self, name: &str) -> Result<()> {
        self.store.remove(&collection_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn storage() -> (Arc<MemoryStore>, CollectionStorage) {
        let store = Arc::new(MemoryStore::new());
        let storage = CollectionStorage::new(store.clone());
        (store, storage)
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(collection_key("users"), "hotzenplotz_users");
        assert_eq!(collection_key("system"), "hotzenplotz_system");
    }

    #[test]
    fn test_save_and_load() {
        let (store, storage) = storage();
        let items = vec![
            Item::new("abc").with_field("x", json!(1)),
            Item::new("def").with_field("nested", json!({"a": [1, 2]})),
        ];

        storage.save("users", &items).unwrap();
        assert!(store.read("hotzenplotz_users").unwrap().is_some());
        assert_eq!(storage.load("users").unwrap(), items);
    }

    #[test]
    fn test_registry_round_trip() {
        let (store, storage) = storage();
        assert!(storage.registry().is_empty());

        storage
            .write_registry(&["system".to_string(), "users".to_string()])
            .unwrap();
        assert_eq!(
            store.read(STORAGE_PREFIX).unwrap().as_deref(),
            Some(r#"["system","users"]"#)
        );
        assert_eq!(storage.registry(), vec!["system", "users"]);
    }

    #[test]
    fn test_malformed_entries_are_absent() {
        let (store, storage) = storage();
        store.write(STORAGE_PREFIX, "not json").unwrap();
        store.write("hotzenplotz_users", "{broken").unwrap();

        assert!(storage.registry().is_empty());
        assert!(storage.load("users").is_none());
        assert!(storage.load("missing").is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (store, storage) = storage();
        storage.save("users", &[Item::new("a")]).unwrap();

        storage.remove("users").unwrap();
        storage.remove("users").unwrap();
        assert!(store.read("hotzenplotz_users").unwrap().is_none());
    }
}

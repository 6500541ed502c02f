//! Types shared by the cache, the reconciler and the storage adapter

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the collection carrying the server revision
pub const SYSTEM_COLLECTION: &str = "system";

/// A normalized record with a flat identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Canonical identifier (taken from `_id.$oid` on the wire)
    pub id: String,
    /// Every other field supplied by the server
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Add a field (builder style, mostly for tests and fixtures)
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}

/// An immutable, shared sequence of items
///
/// Collections are replaced wholesale, never mutated in place.
pub type Collection = Arc<[Item]>;

/// Policy deciding whether an in-memory hit short-circuits the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStrategy {
    /// Serve from memory when present, fetch otherwise
    #[default]
    CacheFirst,
    /// Always fetch and overwrite the in-memory entry
    ServerFirst,
}

/// The distinguished item of the `system` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub id: String,
    /// Type tag supplied by the server
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Monotonically non-decreasing across deployments
    pub revision: u64,
}

impl SystemConfig {
    /// Parse the system config from an item
    pub fn from_item(item: &Item) -> Result<Self> {
        let value = serde_json::to_value(item)?;
        serde_json::from_value(value).map_err(|_| CacheError::MissingSystemConfig)
    }

    /// Parse the system config from the first item of a collection
    pub fn from_collection(items: &[Item]) -> Result<Self> {
        items
            .first()
            .ok_or(CacheError::MissingSystemConfig)
            .and_then(Self::from_item)
    }
}

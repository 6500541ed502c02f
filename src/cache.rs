//! In-memory collection cache
//!
//! Maps collection names to their normalized items. Misses (or forced
//! server reads) go to the transport, and successful fetches are written
//! through to durable storage when persistence is enabled.

use crate::error::{CacheError, Result};
use crate::log::Logger;
use crate::normalize::normalize_body;
use crate::storage::CollectionStorage;
use crate::transport::{collection_path, fetch_checked, Transport};
use crate::types::{Collection, Item, LoadStrategy};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

/// Read-through cache of named collections
///
/// Concurrent misses for the same name are not de-duplicated: each one
/// fetches, and the last to complete wins.
pub struct CollectionCache {
    base_url: String,
    transport: Arc<dyn Transport>,
    /// `None` when persistence is disabled
    storage: Option<CollectionStorage>,
    collections: RwLock<BTreeMap<String, Collection>>,
    /// Names whose payload is known to be in durable storage; the registry
    /// is always written from this set
    persisted: Mutex<BTreeSet<String>>,
    logger: Logger,
}

impl CollectionCache {
    /// Create a cache
    ///
    /// `base_url` must already be normalized (see
    /// [`normalize_backend_url`](crate::config::normalize_backend_url)).
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        storage: Option<CollectionStorage>,
        logger: Logger,
    ) -> Self {
        Self::with_collections(base_url, transport, storage, logger, BTreeMap::new())
    }

    /// Create a cache seeded with collections loaded from `storage`
    pub(crate) fn with_collections(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        storage: Option<CollectionStorage>,
        logger: Logger,
        collections: BTreeMap<String, Collection>,
    ) -> Self {
        let persisted = if storage.is_some() {
            collections.keys().cloned().collect()
        } else {
            BTreeSet::new()
        };

        Self {
            base_url: base_url.into(),
            transport,
            storage,
            collections: RwLock::new(collections),
            persisted: Mutex::new(persisted),
            logger,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn persists(&self) -> bool {
        self.storage.is_some()
    }

    pub(crate) fn logger(&self) -> Logger {
        self.logger
    }

    /// Get a collection according to `strategy`
    pub async fn get(&self, name: &str, strategy: LoadStrategy) -> Result<Collection> {
        if name.is_empty() {
            return Err(CacheError::InvalidName(name.to_string()));
        }

        if strategy == LoadStrategy::CacheFirst {
            if let Some(collection) = self.cached(name).await {
                self.logger.log(format!("{} served from memory", name));
                return Ok(collection);
            }
        }

        self.fetch(name).await
    }

    /// In-memory entry only, never touches the network
    pub async fn cached(&self, name: &str) -> Option<Collection> {
        self.collections.read().await.get(name).cloned()
    }

    /// Sorted names of every in-memory collection
    pub async fn names(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }

    /// Remove a collection from memory and durable storage
    ///
    /// Returns whether an in-memory entry existed. Evicting an absent name
    /// is a no-op.
    pub async fn evict(&self, name: &str) -> Result<bool> {
        let removed = self.collections.write().await.remove(name).is_some();

        if let Some(storage) = &self.storage {
            let mut persisted = self.persisted.lock().await;
            storage.remove(name)?;
            persisted.remove(name);
            storage.write_registry(&persisted.iter().cloned().collect::<Vec<_>>())?;
        }

        if removed {
            self.logger.log(format!("{} evicted", name));
        }
        Ok(removed)
    }

    /// Evict every collection except `keep`, rewriting the registry once
    ///
    /// Names only present in the persisted registry are removed as well.
    pub(crate) async fn evict_all_except(&self, keep: &str) -> Result<Vec<String>> {
        let mut evicted: BTreeSet<String> = {
            let mut collections = self.collections.write().await;
            let evicted: BTreeSet<String> = collections
                .keys()
                .filter(|name| name.as_str() != keep)
                .cloned()
                .collect();
            for name in &evicted {
                collections.remove(name);
            }
            evicted
        };

        if let Some(storage) = &self.storage {
            let mut persisted = self.persisted.lock().await;
            evicted.extend(
                storage
                    .registry()
                    .into_iter()
                    .chain(persisted.iter().cloned())
                    .filter(|name| name != keep),
            );
            for name in &evicted {
                storage.remove(name)?;
                persisted.remove(name);
            }
            storage.write_registry(&persisted.iter().cloned().collect::<Vec<_>>())?;
        }

        let evicted: Vec<String> = evicted.into_iter().collect();
        self.logger.log(format!("evicted {} stale collections", evicted.len()));
        Ok(evicted)
    }

    async fn fetch(&self, name: &str) -> Result<Collection> {
        let path = collection_path(&self.base_url, name);
        self.logger.log(format!("fetching {}", path));

        let body = fetch_checked(self.transport.as_ref(), &path).await?;
        let items = normalize_body(&body)?;
        let collection: Collection = items.into();

        self.collections
            .write()
            .await
            .insert(name.to_string(), collection.clone());

        if let Some(storage) = &self.storage {
            self.persist(storage, name, &collection).await;
        }

        self.logger
            .log(format!("{} fetched ({} items)", name, collection.len()));
        Ok(collection)
    }

    /// Payload first, registry second, so the registry never lists a
    /// collection whose payload is missing.
    async fn persist(&self, storage: &CollectionStorage, name: &str, items: &[Item]) {
        let mut persisted = self.persisted.lock().await;
        if let Err(e) = storage.save(name, items) {
            warn!(collection = name, error = %e, "Failed to persist collection");
            return;
        }
        persisted.insert(name.to_string());
        let names: Vec<String> = persisted.iter().cloned().collect();
        if let Err(e) = storage.write_registry(&names) {
            warn!(collection = name, error = %e, "Failed to update collection registry");
        }
    }
}

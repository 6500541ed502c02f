//! Collection client
//!
//! Entry point tying the cache, durable storage and the startup
//! reconciliation together.

use crate::cache::CollectionCache;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::log::Logger;
use crate::reconcile::{
    load_persisted, persisted_revision, ReconcileHandle, ReconcileState, Reconciler,
};
use crate::storage::{CollectionStorage, DurableStore};
use crate::transport::Transport;
use crate::types::{Collection, LoadStrategy};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Read-through client for server-hosted collections
///
/// Construction never fails and never blocks on the network: persisted
/// collections are loaded synchronously, then the revision check runs as
/// a background task whose outcome is available through the returned
/// [`ReconcileHandle`] and [`CollectionClient::reconcile_state`].
///
/// # Example
///
/// ```rust,no_run
/// use hotzenplotz::{CacheConfig, CollectionClient, HttpTransport, LoadStrategy, MemoryStore};
/// use std::sync::Arc;
///
/// # async fn example() -> hotzenplotz::Result<()> {
/// let config = CacheConfig {
///     persist_locally: true,
///     ..CacheConfig::with_backend("https://api.example.com/data")
/// };
/// let (client, reconciliation) = CollectionClient::new(
///     config,
///     Arc::new(HttpTransport::new(30)?),
///     Arc::new(MemoryStore::new()),
/// );
///
/// // Optional: wait for the revision check
/// let outcome = reconciliation.wait().await?;
///
/// let users = client.collection("users", LoadStrategy::CacheFirst).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CollectionClient {
    cache: Arc<CollectionCache>,
    state: watch::Receiver<ReconcileState>,
}

impl CollectionClient {
    /// Create a client and start reconciliation
    ///
    /// Must be called from within a Tokio runtime when `check_revision` is
    /// enabled, since the server half of reconciliation is spawned.
    pub fn new(
        config: CacheConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn DurableStore>,
    ) -> (Self, ReconcileHandle) {
        let logger = Logger::new(config.debug);
        let base_url = config.base_url();
        let storage = config
            .persist_locally
            .then(|| CollectionStorage::new(store));

        let collections = storage
            .as_ref()
            .map(load_persisted)
            .unwrap_or_else(BTreeMap::new);
        let persisted = persisted_revision(&collections);

        let initial = match persisted {
            Some(revision) => ReconcileState::LocalStateLoaded { revision },
            None => ReconcileState::NoLocalState,
        };
        info!(
            base_url = %base_url,
            loaded = collections.len(),
            persisted_revision = ?persisted,
            "Collection cache initialized"
        );

        let cache = Arc::new(CollectionCache::with_collections(
            base_url,
            transport,
            storage,
            logger,
            collections,
        ));
        let (state_tx, state_rx) = watch::channel(initial);

        let handle = if config.check_revision {
            let reconciler = Reconciler::new(cache.clone(), state_tx);
            ReconcileHandle::spawned(tokio::spawn(reconciler.run(persisted)))
        } else {
            state_tx.send_replace(ReconcileState::Reconciled { evicted: false });
            ReconcileHandle::skipped()
        };

        (
            Self {
                cache,
                state: state_rx,
            },
            handle,
        )
    }

    /// Get a collection, from memory or the backend depending on `strategy`
    pub async fn collection(&self, name: &str, strategy: LoadStrategy) -> Result<Collection> {
        self.cache.get(name, strategy).await
    }

    /// Evict a collection from memory and durable storage
    pub async fn evict(&self, name: &str) -> Result<bool> {
        self.cache.evict(name).await
    }

    /// In-memory entry only
    pub async fn cached(&self, name: &str) -> Option<Collection> {
        self.cache.cached(name).await
    }

    /// Names of every in-memory collection
    pub async fn names(&self) -> Vec<String> {
        self.cache.names().await
    }

    /// Current reconciliation state
    pub fn reconcile_state(&self) -> ReconcileState {
        self.state.borrow().clone()
    }

    /// Subscribe to reconciliation state changes
    pub fn watch_reconcile_state(&self) -> watch::Receiver<ReconcileState> {
        self.state.clone()
    }

    pub fn cache(&self) -> &CollectionCache {
        &self.cache
    }
}

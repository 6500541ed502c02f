//! Startup revision reconciliation
//!
//! Runs once per client:
//! 1. Load whatever the durable store holds into memory (best-effort)
//! 2. Remember the persisted `system` revision, if any
//! 3. Fetch `system` from the server, bypassing memory
//! 4. If a baseline existed and the server revision is newer, evict every
//!    other collection
//!
//! Evictions only happen after a successful comparison, so a failed run
//! leaves possibly stale but never corrupted state behind.

use crate::cache::CollectionCache;
use crate::error::{CacheError, Result};
use crate::storage::CollectionStorage;
use crate::types::{Collection, LoadStrategy, SystemConfig, SYSTEM_COLLECTION};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Where the reconciliation state machine currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReconcileState {
    Uninitialized,
    /// Load phase found a persisted system revision
    LocalStateLoaded { revision: u64 },
    /// Nothing usable persisted
    NoLocalState,
    Reconciled { evicted: bool },
    Failed { reason: String },
}

impl ReconcileState {
    /// Whether the state machine reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Reconciled { .. } | Self::Failed { .. })
    }
}

/// Result of a completed reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Revision checking is disabled
    Skipped,
    /// No persisted revision to compare against
    NoBaseline { current: u64 },
    UpToDate { revision: u64 },
    /// Server advanced, stale collections were evicted
    Invalidated {
        previous: u64,
        current: u64,
        evicted: Vec<String>,
    },
}

impl ReconcileOutcome {
    pub fn evicted(&self) -> &[String] {
        match self {
            Self::Invalidated { evicted, .. } => evicted,
            _ => &[],
        }
    }
}

/// Awaitable handle on the background reconciliation
///
/// Dropping the handle does not cancel the task.
#[derive(Debug)]
pub struct ReconcileHandle {
    task: Option<JoinHandle<Result<ReconcileOutcome>>>,
}

impl ReconcileHandle {
    pub(crate) fn skipped() -> Self {
        Self { task: None }
    }

    pub(crate) fn spawned(task: JoinHandle<Result<ReconcileOutcome>>) -> Self {
        Self { task: Some(task) }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for reconciliation to complete
    pub async fn wait(self) -> Result<ReconcileOutcome> {
        match self.task {
            None => Ok(ReconcileOutcome::Skipped),
            Some(task) => task
                .await
                .map_err(|e| CacheError::Internal(format!("reconciliation task failed: {}", e)))?,
        }
    }
}

/// Load every registered collection from durable storage
///
/// Missing or malformed entries are skipped. Their payloads are dropped and
/// the registry is rewritten to the loaded names.
pub fn load_persisted(storage: &CollectionStorage) -> BTreeMap<String, Collection> {
    let mut collections = BTreeMap::new();
    let mut skipped = Vec::new();
    for name in storage.registry() {
        match storage.load(&name) {
            Some(items) => {
                collections.insert(name, items.into());
            }
            None => {
                warn!(collection = %name, "Registered collection missing or unreadable");
                skipped.push(name);
            }
        }
    }

    if !skipped.is_empty() {
        for name in &skipped {
            if let Err(e) = storage.remove(name) {
                warn!(collection = %name, error = %e, "Failed to drop unreadable collection");
            }
        }
        let names: Vec<String> = collections.keys().cloned().collect();
        if let Err(e) = storage.write_registry(&names) {
            warn!(error = %e, "Failed to rewrite collection registry");
        }
    }
    collections
}

/// Persisted system revision, if the loaded state carries one
pub fn persisted_revision(collections: &BTreeMap<String, Collection>) -> Option<u64> {
    let system = collections.get(SYSTEM_COLLECTION)?;
    match SystemConfig::from_collection(system) {
        Ok(config) => Some(config.revision),
        Err(e) => {
            warn!(error = %e, "Ignoring persisted system collection");
            None
        }
    }
}

/// Drives the server half of the state machine
pub struct Reconciler {
    cache: Arc<CollectionCache>,
    state: watch::Sender<ReconcileState>,
}

impl Reconciler {
    pub fn new(cache: Arc<CollectionCache>, state: watch::Sender<ReconcileState>) -> Self {
        Self { cache, state }
    }

    /// Fetch the server revision and evict if the persisted one is stale
    pub async fn run(self, persisted: Option<u64>) -> Result<ReconcileOutcome> {
        match self.reconcile(persisted).await {
            Ok(outcome) => {
                let evicted = matches!(outcome, ReconcileOutcome::Invalidated { .. });
                self.state.send_replace(ReconcileState::Reconciled { evicted });
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Revision reconciliation failed, keeping local state");
                self.state.send_replace(ReconcileState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn reconcile(&self, persisted: Option<u64>) -> Result<ReconcileOutcome> {
        let system = self
            .cache
            .get(SYSTEM_COLLECTION, LoadStrategy::ServerFirst)
            .await?;
        let current = SystemConfig::from_collection(&system)?.revision;

        let Some(previous) = persisted else {
            info!(revision = current, "No persisted revision, nothing to reconcile");
            return Ok(ReconcileOutcome::NoBaseline { current });
        };

        if current <= previous {
            if current < previous {
                warn!(previous, current, "Server revision is behind the persisted one");
            }
            self.cache
                .logger()
                .log(format!("revision {} is up to date", previous));
            return Ok(ReconcileOutcome::UpToDate { revision: previous });
        }

        let evicted = self.cache.evict_all_except(SYSTEM_COLLECTION).await?;
        info!(
            previous,
            current,
            evicted = evicted.len(),
            "Server revision advanced, evicted stale collections"
        );
        Ok(ReconcileOutcome::Invalidated {
            previous,
            current,
            evicted,
        })
    }
}

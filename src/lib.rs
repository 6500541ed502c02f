//! Hotzenplotz - read-through cache for server-hosted JSON collections
//!
//! Collections are fetched from a backend once, kept in memory for the
//! lifetime of the process and optionally persisted to a durable
//! key-value store.
//!
//! # Architecture
//!
//! - **Transport**: GET primitive returning status + body ([`Transport`])
//! - **Durable store**: string key-value store ([`DurableStore`]), namespaced
//!   by [`CollectionStorage`]
//! - **Normalizer**: `{"_id": {"$oid": "abc"}}` becomes `{"id": "abc"}`
//! - **Cache**: per-name memory / network decision ([`CollectionCache`])
//! - **Reconciler**: at startup, compares the persisted `system` revision
//!   with the server's and evicts everything else when the server advanced
//!
//! # Example
//!
//! ```rust,no_run
//! use hotzenplotz::{CacheConfig, CollectionClient, HttpTransport, LoadStrategy, SledStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> hotzenplotz::Result<()> {
//! let config = CacheConfig {
//!     persist_locally: true,
//!     ..CacheConfig::with_backend("https://api.example.com/data")
//! };
//! let store = SledStore::open(config.store_dir())?;
//!
//! let (client, _reconciliation) = CollectionClient::new(
//!     config,
//!     Arc::new(HttpTransport::new(30)?),
//!     Arc::new(store),
//! );
//!
//! // Served from memory after the first fetch
//! let users = client.collection("users", LoadStrategy::CacheFirst).await?;
//!
//! // Always hits the backend
//! let fresh = client.collection("users", LoadStrategy::ServerFirst).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod log;
pub mod normalize;
pub mod reconcile;
pub mod storage;
pub mod transport;
pub mod types;

// Re-export main types
pub use cache::CollectionCache;
pub use client::CollectionClient;
pub use config::{normalize_backend_url, CacheConfig};
pub use error::{CacheError, Result};
pub use reconcile::{ReconcileHandle, ReconcileOutcome, ReconcileState};
pub use storage::{CollectionStorage, DurableStore, MemoryStore, SledStore, STORAGE_PREFIX};
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{Collection, Item, LoadStrategy, SystemConfig, SYSTEM_COLLECTION};

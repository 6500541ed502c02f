//! Hotzenplotz command-line client
//!
//! ## Usage
//!
//! ```bash
//! # Fetch a collection (served from the local store when already cached)
//! hotzenplotz --backend-url https://api.example.com/data get users
//!
//! # Always go to the backend
//! hotzenplotz --backend-url https://api.example.com/data get users --server-first
//!
//! # Drop a cached collection
//! hotzenplotz --backend-url https://api.example.com/data evict users
//!
//! # Show the startup revision check
//! hotzenplotz --config /path/to/config.toml revision
//! ```

use clap::{Parser, Subcommand};
use hotzenplotz::{
    CacheConfig, CollectionClient, DurableStore, HttpTransport, LoadStrategy, MemoryStore,
    ReconcileOutcome, SledStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hotzenplotz")]
#[command(about = "Read-through cache for server-hosted JSON collections")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend URL collections are fetched from
    #[arg(long, env = "HOTZENPLOTZ_BACKEND_URL")]
    backend_url: Option<String>,

    /// Directory of the on-disk store
    #[arg(long, env = "HOTZENPLOTZ_STORE_DIR")]
    store_dir: Option<PathBuf>,

    /// Keep collections in memory only
    #[arg(long)]
    no_persist: bool,

    /// Skip the startup revision check
    #[arg(long)]
    skip_revision_check: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Verbose cache logging
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a collection as JSON
    Get {
        name: String,

        /// Bypass the cache and fetch from the backend
        #[arg(long)]
        server_first: bool,
    },
    /// Remove a collection from the cache
    Evict { name: String },
    /// List cached collection names
    List,
    /// Print the outcome of the startup revision check
    Revision,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        CacheConfig::load(config_path)?
    } else {
        CacheConfig {
            persist_locally: true,
            ..Default::default()
        }
    };

    // Apply CLI overrides
    if let Some(url) = args.backend_url {
        config.backend_url = Some(url);
    }
    if let Some(dir) = args.store_dir {
        config.store_dir = Some(dir);
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = timeout;
    }
    if args.no_persist {
        config.persist_locally = false;
    }
    if args.skip_revision_check {
        config.check_revision = false;
    }
    config.debug |= args.debug;

    let directive = if config.debug { "hotzenplotz=debug" } else { "hotzenplotz=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let store: Arc<dyn DurableStore> = if config.persist_locally {
        let dir = config.store_dir();
        std::fs::create_dir_all(&dir)?;
        Arc::new(SledStore::open(dir.join("collections.sled"))?)
    } else {
        Arc::new(MemoryStore::new())
    };
    let transport = Arc::new(HttpTransport::new(config.timeout_secs)?);

    info!(backend_url = %config.base_url(), persist = config.persist_locally, "Starting hotzenplotz");
    let (client, reconciliation) = CollectionClient::new(config, transport, store);

    let outcome = match reconciliation.wait().await {
        Ok(outcome) => {
            if let ReconcileOutcome::Invalidated { previous, current, ref evicted } = outcome {
                info!(previous, current, evicted = ?evicted, "Cache invalidated");
            }
            Some(outcome)
        }
        Err(e) => {
            warn!(error = %e, "Revision check failed, continuing with local state");
            None
        }
    };

    match args.command {
        Command::Get { name, server_first } => {
            let strategy = if server_first {
                LoadStrategy::ServerFirst
            } else {
                LoadStrategy::CacheFirst
            };
            let items = client.collection(&name, strategy).await?;
            println!("{}", serde_json::to_string_pretty(&items[..])?);
        }
        Command::Evict { name } => {
            let removed = client.evict(&name).await?;
            info!(collection = %name, removed, "Evicted");
        }
        Command::List => {
            for name in client.names().await {
                println!("{}", name);
            }
        }
        Command::Revision => {
            println!("{}", serde_json::to_string_pretty(&client.reconcile_state())?);
            if let Some(outcome) = outcome {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
        }
    }

    Ok(())
}

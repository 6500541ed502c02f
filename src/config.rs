//! Configuration for the collection cache

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default directory for the on-disk store
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hotzenplotz")
}

/// Make sure the backend URL ends with exactly one `/`
///
/// An empty or missing URL resolves to `/`.
pub fn normalize_backend_url(url: Option<&str>) -> String {
    let trimmed = url.unwrap_or_default().trim_end_matches('/');
    format!("{}/", trimmed)
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Base URL collections are fetched from
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Persist every fetched collection to the durable store
    #[serde(default)]
    pub persist_locally: bool,

    /// Verbose cache logging
    #[serde(default)]
    pub debug: bool,

    /// Compare the persisted system revision with the server at startup
    #[serde(default = "default_true")]
    pub check_revision: bool,

    /// Per-request timeout for the HTTP transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory of the on-disk store
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            persist_locally: false,
            debug: false,
            check_revision: true,
            timeout_secs: default_timeout_secs(),
            store_dir: None,
        }
    }
}

impl CacheConfig {
    /// Config pointing at a backend, everything else default
    pub fn with_backend(url: impl Into<String>) -> Self {
        Self {
            backend_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CacheError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        toml::from_str(&content).map_err(|e| CacheError::Config(e.to_string()))
    }

    /// Save config to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CacheError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| CacheError::Config(format!("{}: {}", path.as_ref().display(), e)))
    }

    /// Normalized base URL, always ending with `/`
    pub fn base_url(&self) -> String {
        normalize_backend_url(self.backend_url.as_deref())
    }

    /// Store directory, falling back to the platform data dir
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(default_store_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_gets_single_trailing_slash() {
        assert_eq!(normalize_backend_url(Some("http://api.test")), "http://api.test/");
        assert_eq!(normalize_backend_url(Some("http://api.test/")), "http://api.test/");
        assert_eq!(normalize_backend_url(Some("http://api.test/data")), "http://api.test/data/");
        assert_eq!(normalize_backend_url(Some("/data/")), "/data/");
    }

    #[test]
    fn test_missing_backend_url_defaults_to_root() {
        assert_eq!(normalize_backend_url(None), "/");
        assert_eq!(normalize_backend_url(Some("")), "/");
        assert_eq!(CacheConfig::default().base_url(), "/");
    }

    #[test]
    fn test_toml_defaults() {
        let config: CacheConfig = toml::from_str("backend_url = \"http://api.test\"").unwrap();
        assert_eq!(config.base_url(), "http://api.test/");
        assert!(!config.persist_locally);
        assert!(config.check_revision);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = CacheConfig {
            persist_locally: true,
            debug: true,
            ..CacheConfig::with_backend("http://api.test")
        };
        config.save(&path).unwrap();

        let loaded = CacheConfig::load(&path).unwrap();
        assert_eq!(loaded.backend_url.as_deref(), Some("http://api.test"));
        assert!(loaded.persist_locally);
        assert!(loaded.debug);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CacheConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }
}

//! On-disk store backed by sled

use super::DurableStore;
use crate::error::{CacheError, Result};
use sled::Db;
use std::path::Path;
use tracing::info;

/// [`DurableStore`] persisted in a sled database
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "Opened collection store");
        Ok(Self { db })
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl DurableStore for SledStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match self.db.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|e| CacheError::Storage(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.sled");

        {
            let store = SledStore::open(&path).unwrap();
            store.write("hotzenplotz", r#"["users"]"#).unwrap();
            store.write("hotzenplotz_users", "[]").unwrap();
            store.remove("hotzenplotz_users").unwrap();
            store.flush().unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        assert_eq!(
            store.read("hotzenplotz").unwrap().as_deref(),
            Some(r#"["users"]"#)
        );
        assert!(store.read("hotzenplotz_users").unwrap().is_none());
    }
}

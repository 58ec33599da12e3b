//! Key/value storage backing the config and role records
//!
//! Values are opaque bytes; the typed stores in `config` and `roles` own the
//! JSON encoding.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable key/value storage
#[async_trait]
pub trait Storage: Send + Sync {
    /// Get the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List keys under `prefix`, with the prefix stripped, in sorted order
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-memory storage
#[derive(Default)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key[prefix.len()..].to_string())
            .collect())
    }
}

/// Sled-backed persistent storage
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open (or create) a database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }
}

#[async_trait]
impl Storage for SledStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|value| value.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.db.remove(key)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (key, _) = item?;
            let key = String::from_utf8_lossy(&key);
            keys.push(key[prefix.len()..].to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(storage: &dyn Storage) {
        storage.put("role/b", b"2".to_vec()).await.unwrap();
        storage.put("role/a", b"1".to_vec()).await.unwrap();
        storage.put("config", b"c".to_vec()).await.unwrap();

        assert_eq!(storage.get("role/a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(storage.get("role/zzz").await.unwrap(), None);
        assert_eq!(storage.list("role/").await.unwrap(), vec!["a", "b"]);

        storage.delete("role/a").await.unwrap();
        storage.delete("role/a").await.unwrap();
        assert_eq!(storage.list("role/").await.unwrap(), vec!["b"]);
        assert_eq!(storage.get("config").await.unwrap(), Some(b"c".to_vec()));
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        exercise(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn test_sled_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();
        exercise(&storage).await;
    }
}

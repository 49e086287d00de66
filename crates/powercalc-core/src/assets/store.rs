use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use super::{AssetError, AssetResponse};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }
}

/// Key-value cache store: version name -> named byte resources.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// All cache names, oldest version first.
    async fn cache_names(&self) -> Result<Vec<String>, AssetError>;

    /// Create the named cache if it does not exist.
    async fn open(&self, cache: &str) -> Result<(), AssetError>;

    async fn put(&self, cache: &str, key: &str, response: AssetResponse) -> Result<(), AssetError>;

    async fn lookup(
        &self,
        cache: &str,
        key: &str,
    ) -> Result<Option<CachedData<AssetResponse>>, AssetError>;

    /// Delete a whole cache. Returns false if it did not exist.
    async fn delete(&self, cache: &str) -> Result<bool, AssetError>;

    /// Record `cache` as the version a restart should resume.
    async fn set_active(&self, cache: &str) -> Result<(), AssetError>;

    /// The version last recorded with `set_active`.
    async fn active(&self) -> Result<Option<String>, AssetError>;
}

// ============================================================================
// Disk Store
// ============================================================================

/// Name of the file at the store root naming the active version.
/// A plain file, so it never shows up in `cache_names`.
const ACTIVE_FILE: &str = "ACTIVE";

/// One directory per cache version, one JSON envelope per entry.
pub struct DiskCacheStore {
    root: PathBuf,
}

impl DiskCacheStore {
    pub fn new(root: PathBuf) -> Result<Self, AssetError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn cache_path(&self, cache: &str) -> PathBuf {
        self.root.join(cache)
    }

    fn entry_path(&self, cache: &str, key: &str) -> PathBuf {
        self.cache_path(cache).join(format!("{}.json", encode_key(key)))
    }
}

/// Map a request path onto a flat, reversible file name.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len() * 2);
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{:02x}", byte));
        }
    }
    encoded
}

#[async_trait]
impl CacheStorage for DiskCacheStore {
    async fn cache_names(&self) -> Result<Vec<String>, AssetError> {
        let mut names = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn open(&self, cache: &str) -> Result<(), AssetError> {
        tokio::fs::create_dir_all(self.cache_path(cache)).await?;
        Ok(())
    }

    async fn put(&self, cache: &str, key: &str, response: AssetResponse) -> Result<(), AssetError> {
        tokio::fs::create_dir_all(self.cache_path(cache)).await?;
        let path = self.entry_path(cache, key);
        let contents = serde_json::to_vec(&CachedData::new(response))?;
        tokio::fs::write(&path, contents).await?;
        debug!(cache, key, "Stored asset");
        Ok(())
    }

    async fn lookup(
        &self,
        cache: &str,
        key: &str,
    ) -> Result<Option<CachedData<AssetResponse>>, AssetError> {
        let path = self.entry_path(cache, key);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&contents)?))
    }

    async fn delete(&self, cache: &str) -> Result<bool, AssetError> {
        match tokio::fs::remove_dir_all(self.cache_path(cache)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_active(&self, cache: &str) -> Result<(), AssetError> {
        // Write then rename, so a crash never leaves a half-written pointer
        let tmp = self.root.join(format!("{}.tmp", ACTIVE_FILE));
        tokio::fs::write(&tmp, cache).await?;
        tokio::fs::rename(&tmp, self.root.join(ACTIVE_FILE)).await?;
        debug!(cache, "Recorded active asset cache");
        Ok(())
    }

    async fn active(&self) -> Result<Option<String>, AssetError> {
        match tokio::fs::read_to_string(self.root.join(ACTIVE_FILE)).await {
            Ok(contents) => {
                let name = contents.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory Store
// ============================================================================

type Entries = BTreeMap<String, CachedData<AssetResponse>>;

/// In-process store, for hosts without a writable cache directory.
#[derive(Default)]
pub struct MemoryCacheStore {
    caches: RwLock<BTreeMap<String, Entries>>,
    active: RwLock<Option<String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStore {
    async fn cache_names(&self) -> Result<Vec<String>, AssetError> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn open(&self, cache: &str) -> Result<(), AssetError> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default();
        Ok(())
    }

    async fn put(&self, cache: &str, key: &str, response: AssetResponse) -> Result<(), AssetError> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), CachedData::new(response));
        Ok(())
    }

    async fn lookup(
        &self,
        cache: &str,
        key: &str,
    ) -> Result<Option<CachedData<AssetResponse>>, AssetError> {
        Ok(self
            .caches
            .read()
            .await
            .get(cache)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn delete(&self, cache: &str) -> Result<bool, AssetError> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }

    async fn set_active(&self, cache: &str) -> Result<(), AssetError> {
        *self.active.write().await = Some(cache.to_string());
        Ok(())
    }

    async fn active(&self) -> Result<Option<String>, AssetError> {
        Ok(self.active.read().await.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_is_flat_and_distinct() {
        assert_eq!(encode_key("/"), "_2f");
        assert_eq!(encode_key("/app.js"), "_2fapp.js");
        assert_eq!(encode_key("/icons/icon-192.png"), "_2ficons_2ficon-192.png");
        assert_ne!(encode_key("/a_b"), encode_key("/a/b"));
    }

    #[tokio::test]
    async fn test_disk_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::new(dir.path().join("assets")).unwrap();

        store.open("v2").await.unwrap();
        store.open("v1").await.unwrap();
        assert_eq!(store.cache_names().await.unwrap(), vec!["v1", "v2"]);

        let css = AssetResponse::ok("text/css", "body { margin: 0 }");
        store.put("v1", "/styles.css", css.clone()).await.unwrap();

        let hit = store.lookup("v1", "/styles.css").await.unwrap().unwrap();
        assert_eq!(hit.data, css);
        assert!(store.lookup("v1", "/app.js").await.unwrap().is_none());
        assert!(store.lookup("v2", "/styles.css").await.unwrap().is_none());

        assert!(store.delete("v1").await.unwrap());
        assert!(!store.delete("v1").await.unwrap());
        assert_eq!(store.cache_names().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_disk_store_active_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.active().await.unwrap(), None);

        store.open("v1").await.unwrap();
        store.set_active("v1").await.unwrap();
        store.set_active("v2").await.unwrap();

        // The pointer survives a new handle and is not a cache itself
        let reopened = DiskCacheStore::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.active().await.unwrap().as_deref(), Some("v2"));
        assert_eq!(reopened.cache_names().await.unwrap(), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryCacheStore::new();
        store.open("b").await.unwrap();
        store
            .put("a", "/", AssetResponse::ok("text/html", "<html>"))
            .await
            .unwrap();
        assert_eq!(store.cache_names().await.unwrap(), vec!["a", "b"]);
        assert!(store.lookup("a", "/").await.unwrap().is_some());
        assert!(store.delete("a").await.unwrap());
        assert!(store.lookup("a", "/").await.unwrap().is_none());

        store.set_active("b").await.unwrap();
        assert_eq!(store.active().await.unwrap().as_deref(), Some("b"));
    }
}

//! Named response caches: the storage substrate behind the offline worker.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::worker::request::{Response, ResponseKind};

/// Predicate deciding which caches [`CacheStore::delete_all`] removes.
pub type CachePredicate<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

/// A set of named caches, each mapping request keys to stored responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Creates the named cache if it does not exist yet.
    async fn open(&self, cache: &str) -> Result<()>;

    /// Names of all existing caches.
    async fn cache_names(&self) -> Result<Vec<String>>;

    /// Request keys stored in the named cache. Empty if the cache does not exist.
    async fn keys(&self, cache: &str) -> Result<Vec<String>>;

    /// Looks up a stored response.
    async fn get(&self, cache: &str, key: &str) -> Result<Option<Response>>;

    /// Stores a response, creating the cache if needed and replacing any previous entry.
    async fn put(&self, cache: &str, key: &str, response: &Response) -> Result<()>;

    /// Deletes every cache whose name matches `predicate`, returning the deleted names.
    async fn delete_all(&self, predicate: CachePredicate<'_>) -> Result<Vec<String>>;

    /// Checks whether a response is stored. Lookup failures count as absent.
    async fn has(&self, cache: &str, key: &str) -> bool {
        matches!(self.get(cache, key).await, Ok(Some(_)))
    }
}

/// Rejects names that could escape the cache root on disk.
fn validate_cache_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::Cache(format!("invalid cache name {name:?}")));
    }
    Ok(())
}

/// Caches held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    caches: RwLock<BTreeMap<String, BTreeMap<String, Response>>>,
}

impl MemoryCache {
    /// Creates an empty cache set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn open(&self, cache: &str) -> Result<()> {
        validate_cache_name(cache)?;
        self.caches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cache.to_string())
            .or_default();
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        let caches = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        Ok(caches.keys().cloned().collect())
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        let caches = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        Ok(caches
            .get(cache)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<Response>> {
        let caches = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        Ok(caches.get(cache).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, cache: &str, key: &str, response: &Response) -> Result<()> {
        validate_cache_name(cache)?;
        self.caches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn delete_all(&self, predicate: CachePredicate<'_>) -> Result<Vec<String>> {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<String> = caches.keys().filter(|n| predicate(n)).cloned().collect();
        for name in &doomed {
            caches.remove(name);
        }
        Ok(doomed)
    }
}

/// Metadata written next to each cached body.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    url: String,
    status: u16,
    kind: ResponseKind,
    headers: Vec<(String, String)>,
    /// Name of the body file this metadata commits to.
    body_file: String,
}

/// Caches stored under a root directory: one subdirectory per cache, two
/// files per entry. `<id>.json` holds the metadata, where `<id>` is the
/// SHA-256 of the request key. It names the body file
/// `<id>-<body digest>.body`, so replacing the metadata is the single commit
/// point of a write.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Creates a cache set rooted at `root`. Directories are created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, cache: &str) -> Result<PathBuf> {
        validate_cache_name(cache)?;
        Ok(self.root.join(cache))
    }

    async fn read_meta(path: &Path) -> Result<EntryMeta> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Hex SHA-256 of a request key, used as the entry file stem.
fn entry_id(key: &str) -> String {
    hex_digest(key.as_bytes())
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn body_file_name(id: &str, body: &[u8]) -> String {
    format!("{id}-{}.body", &hex_digest(body)[..16])
}

fn is_not_found(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::NotFound
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn open(&self, cache: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.cache_dir(cache)?).await?;
        Ok(())
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(read_dir) => read_dir,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        let dir = self.cache_dir(cache)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match Self::read_meta(&path).await {
                    Ok(meta) => keys.push(meta.key),
                    Err(e) => log::warn!("Skipping unreadable cache entry {}: {e}", path.display()),
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<Response>> {
        let dir = self.cache_dir(cache)?;
        let id = entry_id(key);
        let meta = match Self::read_meta(&dir.join(format!("{id}.json"))).await {
            Ok(meta) => meta,
            Err(Error::Io(e)) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        if meta.body_file.contains(['/', '\\']) {
            return Err(Error::Cache(format!("corrupt entry for {key}")));
        }
        let body = match tokio::fs::read(dir.join(&meta.body_file)).await {
            Ok(body) => body,
            Err(e) if is_not_found(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Response {
            url: meta.url,
            status: meta.status,
            kind: meta.kind,
            headers: meta.headers,
            body: Bytes::from(body),
        }))
    }

    async fn put(&self, cache: &str, key: &str, response: &Response) -> Result<()> {
        let dir = self.cache_dir(cache)?;
        tokio::fs::create_dir_all(&dir).await?;

        let id = entry_id(key);
        let meta_path = dir.join(format!("{id}.json"));
        let previous = Self::read_meta(&meta_path).await.ok();

        let meta = EntryMeta {
            key: key.to_string(),
            url: response.url.clone(),
            status: response.status,
            kind: response.kind,
            headers: response.headers.clone(),
            body_file: body_file_name(&id, &response.body),
        };

        let body_path = dir.join(&meta.body_file);
        let body_tmp = dir.join(format!("{}.tmp", meta.body_file));
        tokio::fs::write(&body_tmp, &response.body).await?;
        tokio::fs::rename(&body_tmp, &body_path).await?;

        // Until this rename lands, readers keep seeing the previous entry whole.
        let meta_tmp = dir.join(format!("{id}.json.tmp"));
        tokio::fs::write(&meta_tmp, serde_json::to_vec(&meta)?).await?;
        tokio::fs::rename(&meta_tmp, &meta_path).await?;

        if let Some(old) = previous.filter(|old| old.body_file != meta.body_file) {
            if let Err(e) = tokio::fs::remove_file(dir.join(&old.body_file)).await {
                if !is_not_found(&e) {
                    log::warn!("Could not remove replaced body {}: {e}", old.body_file);
                }
            }
        }
        Ok(())
    }

    async fn delete_all(&self, predicate: CachePredicate<'_>) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.cache_names().await? {
            if predicate(&name) {
                tokio::fs::remove_dir_all(self.root.join(&name)).await?;
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}

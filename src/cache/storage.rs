//! Named cache storage shared by every worker instance of an origin.
//!
//! DESIGN
//! ======
//! `CacheStorage` is injected into the worker. `MemoryCacheStorage` keeps
//! everything in a `BTreeMap` (tests, ephemeral proxies). `DiskCacheStorage`
//! lays caches out as directories:
//!
//! ```text
//! <root>/<sha256(cache name)>/NAME            cache name, verbatim
//! <root>/<sha256(cache name)>/<sha256(url)>.json   entry metadata
//! <root>/<sha256(cache name)>/<sha256(url)>.body   entry body
//! ```
//!
//! The body is written before the metadata, so an entry is only visible once
//! both exist. Writes to the same URL are last-writer-wins.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::types::{CacheEntry, CacheError};

const NAME_FILE: &str = "NAME";

#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of every existing cache.
    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a whole cache. Returns whether it existed.
    async fn delete(&self, cache: &str) -> Result<bool, CacheError>;

    /// Look up `url` in one cache.
    async fn match_in(&self, cache: &str, url: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Look up `url` across all caches, in name order.
    async fn match_any(&self, url: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry, creating the cache if needed.
    async fn put(&self, cache: &str, entry: CacheEntry) -> Result<(), CacheError>;
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<BTreeMap<String, BTreeMap<String, CacheEntry>>>,
}

impl MemoryCacheStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn delete(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }

    async fn match_in(&self, cache: &str, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.caches.read().await.get(cache).and_then(|c| c.get(url)).cloned())
    }

    async fn match_any(&self, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.caches.read().await.values().find_map(|c| c.get(url)).cloned())
    }

    async fn put(&self, cache: &str, entry: CacheEntry) -> Result<(), CacheError> {
        self.caches
            .write()
            .await
            .entry(cache.to_owned())
            .or_default()
            .insert(entry.url.clone(), entry);
        Ok(())
    }
}

// =============================================================================
// DISK
// =============================================================================

#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, cache: &str) -> PathBuf {
        self.root.join(hex_digest(cache))
    }

    async fn read_entry(dir: &Path, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        let stem = hex_digest(url);
        let meta = match tokio::fs::read(dir.join(format!("{stem}.json"))).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut entry: CacheEntry = serde_json::from_slice(&meta)?;
        if entry.url != url {
            warn!(url, stored = %entry.url, "cache key collision ignored");
            return Ok(None);
        }
        entry.body = match tokio::fs::read(dir.join(format!("{stem}.body"))).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(url, "cache entry missing body; treating as miss");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(entry))
    }

    /// Cache directories in the order of their names.
    async fn named_dirs(&self) -> Result<Vec<(String, PathBuf)>, CacheError> {
        let mut dirs = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(dirs),
            Err(e) => return Err(e.into()),
        };
        while let Some(item) = read_dir.next_entry().await? {
            let path = item.path();
            match tokio::fs::read_to_string(path.join(NAME_FILE)).await {
                Ok(name) => dirs.push((name, path)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "skipping directory without cache name");
                }
                Err(e) => return Err(e.into()),
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }
}

#[async_trait::async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.named_dirs().await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn delete(&self, cache: &str) -> Result<bool, CacheError> {
        match tokio::fs::remove_dir_all(self.cache_dir(cache)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn match_in(&self, cache: &str, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        Self::read_entry(&self.cache_dir(cache), url).await
    }

    async fn match_any(&self, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        for (_, dir) in self.named_dirs().await? {
            if let Some(entry) = Self::read_entry(&dir, url).await? {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn put(&self, cache: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let dir = self.cache_dir(cache);
        tokio::fs::create_dir_all(&dir).await?;
        let name_path = dir.join(NAME_FILE);
        if !tokio::fs::try_exists(&name_path).await? {
            tokio::fs::write(&name_path, cache).await?;
        }

        let stem = hex_digest(&entry.url);
        tokio::fs::write(dir.join(format!("{stem}.body")), &entry.body).await?;
        let meta = serde_json::to_vec(&entry)?;
        let tmp = dir.join(format!("{stem}.json.tmp"));
        tokio::fs::write(&tmp, meta).await?;
        tokio::fs::rename(&tmp, dir.join(format!("{stem}.json"))).await?;
        Ok(())
    }
}

fn hex_digest(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

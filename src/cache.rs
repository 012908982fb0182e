//! Publish cache for idempotent re-runs.
//!
//! Publishing the same document twice should hand back the first URL
//! instead of creating a second set of pages. This module remembers, per
//! content fingerprint, the URL of the first page of a successful publish.
//!
//! # Design
//!
//! ## Keys
//!
//! The key is a [`fingerprint`]: the first 16 hex chars of SHA-256 over the
//! document text followed by its title. Same text under a new title is a
//! new document; the file name and location play no part.
//!
//! ## Storage
//!
//! [`FileCacheStore`] keeps a pretty-printed JSON manifest, by default at
//! `~/.telepress_cache.json`:
//!
//! ```json
//! { "version": 1, "entries": { "3f2a9c...": "https://telegra.ph/..." } }
//! ```
//!
//! The cache is advisory. Loading never fails: a missing, unreadable,
//! corrupt or wrong-version file yields an empty cache. Save errors are
//! returned so the caller can log them, but a publish never fails because
//! the cache could not be written. Concurrent processes race on the file
//! and the last writer wins.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default cache file name, placed in the home directory.
const CACHE_FILENAME: &str = ".telepress_cache.json";

/// Version of the cache file format. Bump to invalidate existing caches
/// when the format or fingerprint computation changes.
const CACHE_VERSION: u32 = 1;

/// Fingerprint of a document: 16 hex chars of SHA-256(content ‖ title).
pub fn fingerprint(content: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(title.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..16].to_string()
}

/// Fingerprint → first page URL.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct PublishCache {
    pub version: u32,
    pub entries: HashMap<String, String>,
}

impl Default for PublishCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl PublishCache {
    pub fn empty() -> Self {
        Self {
            version: CACHE_VERSION,
            entries: HashMap::new(),
        }
    }

    pub fn lookup(&self, fingerprint: &str) -> Option<&str> {
        self.entries.get(fingerprint).map(String::as_str)
    }

    /// Record a URL, replacing any earlier one for the same fingerprint.
    pub fn store(&mut self, fingerprint: String, url: String) {
        self.entries.insert(fingerprint, url);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a serialized cache, falling back to empty on any problem.
    pub fn from_json(content: &str) -> Self {
        match serde_json::from_str::<Self>(content) {
            Ok(cache) if cache.version == CACHE_VERSION => cache,
            Ok(cache) => {
                tracing::warn!(found = cache.version, "publish cache version mismatch, starting empty");
                Self::empty()
            }
            Err(e) => {
                tracing::warn!(error = %e, "publish cache unreadable, starting empty");
                Self::empty()
            }
        }
    }
}

/// Where a [`PublishCache`] lives between runs.
pub trait PublishCacheStore: Send {
    /// Load the cache. Never fails; problems degrade to an empty cache.
    fn load(&self) -> PublishCache;

    fn save(&self, cache: &PublishCache) -> io::Result<()>;
}

/// JSON file store.
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PublishCacheStore for FileCacheStore {
    fn load(&self) -> PublishCache {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => PublishCache::from_json(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => PublishCache::empty(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read publish cache");
                PublishCache::empty()
            }
        }
    }

    fn save(&self, cache: &PublishCache) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(cache)?;
        std::fs::write(&self.path, json)
    }
}

/// In-memory store, for library callers that want dedup without a file.
#[derive(Default)]
pub struct MemoryCacheStore {
    cache: Mutex<PublishCache>,
    saves: Mutex<usize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `save` has been called.
    pub fn saves(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl PublishCacheStore for MemoryCacheStore {
    fn load(&self) -> PublishCache {
        self.cache.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn save(&self, cache: &PublishCache) -> io::Result<()> {
        let mut stored = self
            .cache
            .lock()
            .map_err(|_| io::Error::other("cache lock poisoned"))?;
        *stored = cache.clone();
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}

impl<T: PublishCacheStore + Sync> PublishCacheStore for std::sync::Arc<T> {
    fn load(&self) -> PublishCache {
        (**self).load()
    }

    fn save(&self, cache: &PublishCache) -> io::Result<()> {
        (**self).save(cache)
    }
}

/// `~/.telepress_cache.json`.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CACHE_FILENAME))
}

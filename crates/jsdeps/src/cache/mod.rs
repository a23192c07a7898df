//! Declaration cache
//!
//! Remembers the provides/requires extracted from each file so unchanged
//! files are not parsed again. Entries are keyed by the file's path
//! relative to a base directory.
//!
//! Freshness is judged against a single cache-wide timestamp: an entry is
//! usable for a file only if the cache was last stamped strictly after the
//! file's modification time. Every [`DeclarationCache::add_cache`] call
//! restamps the cache.

mod controller;
mod store;

pub use controller::CacheController;
pub use store::CacheStore;

use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Errors that can occur while loading or persisting the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error
    #[error("Cache IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Declarations remembered for one file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub requires: Vec<String>,
    pub provides: Vec<String>,
}

/// Cache key for a file: slash-separated path relative to `base`
pub fn cache_key(filename: &Path, base: &Path) -> String {
    path::to_slash(&path::relative_to(filename, base))
}

/// Per-file declaration cache with one global generation time
#[derive(Debug)]
pub struct DeclarationCache {
    store: CacheStore,
    /// When the cache was last stamped
    mtime: Option<SystemTime>,
    /// Generation time entries are checked against during the current pass
    valid_before: Option<SystemTime>,
    entries: BTreeMap<String, CacheEntry>,
    hits: usize,
    misses: usize,
    extractions: usize,
}

impl DeclarationCache {
    /// Create an empty cache that is never loaded from or written to disk
    pub fn in_memory() -> Self {
        Self::empty(CacheStore::Memory)
    }

    fn empty(store: CacheStore) -> Self {
        Self {
            store,
            mtime: None,
            valid_before: None,
            entries: BTreeMap::new(),
            hits: 0,
            misses: 0,
            extractions: 0,
        }
    }

    /// Open a cache on the given store
    ///
    /// A file store loads its previous contents if present. A cache file that
    /// no longer parses is discarded with a warning.
    ///
    /// # Returns
    /// * `Ok(DeclarationCache)` - Loaded (or empty) cache
    /// * `Err(CacheError)` - The cache file exists but could not be read
    pub fn open(store: CacheStore) -> Result<Self, CacheError> {
        let mut cache = Self::empty(store);
        if let Some(snapshot) = cache.store.load()? {
            tracing::debug!(entries = snapshot.entries.len(), "loaded declaration cache");
            cache.mtime = snapshot.mtime;
            cache.entries = snapshot.entries;
        }
        Ok(cache)
    }

    /// Get the raw entry for a key, regardless of freshness
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Start a resolution pass
    ///
    /// Freshness is judged against the generation time at this point until
    /// the next call, so restamps from files extracted during the pass do not
    /// hide other files changed since the last pass.
    pub fn begin_session(&mut self) {
        self.valid_before = self.mtime;
    }

    /// Check if the pass's generation time is newer than `file_mtime`
    pub fn is_fresh(&self, file_mtime: SystemTime) -> bool {
        matches!(self.valid_before, Some(mtime) if mtime > file_mtime)
    }

    /// Get a usable entry for a file, recording a hit or a miss
    pub fn lookup(&mut self, key: &str, file_mtime: SystemTime) -> Option<CacheEntry> {
        let entry = self
            .entries
            .get(key)
            .filter(|_| self.is_fresh(file_mtime))
            .cloned();

        if entry.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        entry
    }

    /// Store freshly extracted declarations and restamp the cache
    pub fn add_cache(&mut self, key: String, requires: Vec<String>, provides: Vec<String>) {
        self.entries.insert(key, CacheEntry { requires, provides });
        self.mtime = Some(SystemTime::now());
        self.extractions += 1;
    }

    /// Persist the cache; a no-op for memory stores
    pub fn write_cache(&self) -> Result<(), CacheError> {
        self.store.save(self.mtime, &self.entries)
    }

    /// Drop one entry
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    /// Drop every entry and reset statistics
    pub fn clear(&mut self) {
        self.entries.clear();
        self.mtime = None;
        self.valid_before = None;
        self.hits = 0;
        self.misses = 0;
        self.extractions = 0;
    }

    /// When the cache was last stamped
    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            extractions: self.extractions,
        }
    }

    /// Get the number of cached files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
    /// Number of files whose declarations were extracted from source
    pub extractions: usize,
}

impl CacheStats {
    /// Get cache hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(
            cache_key(Path::new("/project/src/app/main.js"), Path::new("/project")),
            "src/app/main.js"
        );
    }

    #[test]
    fn test_lookup_respects_global_mtime() {
        let mut cache = DeclarationCache::in_memory();
        let before = SystemTime::now() - Duration::from_secs(60);

        // Never stamped: nothing is fresh
        assert!(!cache.is_fresh(before));

        cache.add_cache("a.js".to_string(), strings(&["b"]), strings(&["a"]));
        cache.begin_session();
        let entry = cache.lookup("a.js", before).unwrap();
        assert_eq!(entry.provides, vec!["a"]);
        assert_eq!(entry.requires, vec!["b"]);

        // A file touched after the stamp is stale
        let after = SystemTime::now() + Duration::from_secs(60);
        assert!(cache.lookup("a.js", after).is_none());
        assert!(cache.get("a.js").is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.extractions, 1);
        assert_eq!(stats.hit_ratio(), 0.5);
    }

    #[test]
    fn test_restamp_does_not_freshen_current_pass() {
        let mut cache = DeclarationCache::in_memory();
        cache.add_cache("a.js".to_string(), vec![], strings(&["a"]));
        cache.add_cache("b.js".to_string(), vec![], strings(&["b"]));

        // Both files change after the previous pass
        let changed = SystemTime::now() + Duration::from_millis(10);
        cache.begin_session();
        std::thread::sleep(Duration::from_millis(20));

        assert!(cache.lookup("a.js", changed).is_none());
        cache.add_cache("a.js".to_string(), vec![], strings(&["a", "a.new"]));
        assert!(cache.mtime().unwrap() > changed);
        assert!(cache.lookup("b.js", changed).is_none());

        // The next pass sees the new stamp
        cache.begin_session();
        assert!(cache.lookup("b.js", changed).is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = DeclarationCache::in_memory();
        cache.add_cache("a.js".to_string(), vec![], strings(&["a"]));
        cache.add_cache("b.js".to_string(), vec![], strings(&["b"]));

        assert!(cache.remove("a.js").is_some());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.mtime(), None);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("deps-cache.json");

        let mut cache = DeclarationCache::open(CacheStore::File(path.clone())).unwrap();
        assert!(cache.is_empty());
        cache.add_cache("src/a.js".to_string(), strings(&["x"]), strings(&["a"]));
        cache.write_cache().unwrap();
        assert!(path.exists());

        let reloaded = DeclarationCache::open(CacheStore::File(path)).unwrap();
        assert_eq!(reloaded.mtime(), cache.mtime());
        assert_eq!(reloaded.get("src/a.js"), cache.get("src/a.js"));
        // Statistics are per process
        assert_eq!(reloaded.stats().extractions, 0);
    }

    #[test]
    fn test_memory_store_writes_nothing() {
        let mut cache = DeclarationCache::in_memory();
        cache.add_cache("a.js".to_string(), vec![], vec![]);
        assert!(cache.write_cache().is_ok());
        assert!(matches!(cache.store(), CacheStore::Memory));
    }
}

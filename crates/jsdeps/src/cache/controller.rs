//! Handle for inspecting and invalidating a resolver's declaration cache

use super::{cache_key, CacheError, CacheStats, DeclarationCache};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared handle to a [`DeclarationCache`]
///
/// Mutations are persisted immediately.
#[derive(Debug, Clone)]
pub struct CacheController {
    cache: Arc<Mutex<DeclarationCache>>,
    base: PathBuf,
}

impl CacheController {
    pub(crate) fn new(cache: Arc<Mutex<DeclarationCache>>, base: PathBuf) -> Self {
        Self { cache, base }
    }

    /// Drop every cached declaration and persist the empty cache
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut cache = self.cache.lock();
        cache.clear();
        cache.write_cache()
    }

    /// Drop the cached declarations of one file
    ///
    /// # Returns
    /// * `Ok(true)` - An entry existed and was removed
    /// * `Ok(false)` - The file was not cached
    pub fn remove(&self, filename: &Path) -> Result<bool, CacheError> {
        let mut cache = self.cache.lock();
        let removed = cache.remove(&cache_key(filename, &self.base)).is_some();
        if removed {
            cache.write_cache()?;
        }
        Ok(removed)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Check whether a file has an entry, fresh or not
    pub fn contains(&self, filename: &Path) -> bool {
        self.cache
            .lock()
            .get(&cache_key(filename, &self.base))
            .is_some()
    }
}

//! Backing stores for the declaration cache

use super::{CacheEntry, CacheError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where the cache lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStore {
    /// Kept for the lifetime of the process only
    Memory,
    /// Persisted as JSON at the given path
    File(PathBuf),
}

/// On-disk layout
#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct Snapshot {
    /// Cache-wide "last written" time
    pub mtime: Option<SystemTime>,
    pub entries: BTreeMap<String, CacheEntry>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    mtime: Option<SystemTime>,
    entries: &'a BTreeMap<String, CacheEntry>,
}

impl CacheStore {
    /// Path of the cache file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            CacheStore::Memory => None,
            CacheStore::File(path) => Some(path),
        }
    }

    pub(super) fn load(&self) -> Result<Option<Snapshot>, CacheError> {
        let Some(path) = self.path() else {
            return Ok(None);
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match serde_json::from_str(&contents) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable cache");
                Ok(None)
            }
        }
    }

    pub(super) fn save(
        &self,
        mtime: Option<SystemTime>,
        entries: &BTreeMap<String, CacheEntry>,
    ) -> Result<(), CacheError> {
        let Some(path) = self.path() else {
            return Ok(());
        };
        let io_err = |source: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&SnapshotRef { mtime, entries })?;

        // Write to a temp file first, then rename
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(io_err)?;
        fs::rename(&tmp_path, path).map_err(io_err)?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "wrote declaration cache");
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Conditional-fetch validators remembered for one feed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

impl CacheEntry {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.modified.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Feed URL -> validators, backed by one JSON file.
///
/// Loaded wholesale at construction; every mutation rewrites the whole file
/// before returning, so a crash loses at most the update in flight. One run
/// owns the store; it is not safe for multiple processes to write it.
pub struct FeedCacheStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, CacheEntry>>,
    io: Mutex<()>,
}

impl FeedCacheStore {
    /// Missing or unreadable files yield an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<BTreeMap<String, CacheEntry>>(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "feed cache unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "feed cache unreadable, starting empty");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), feeds = entries.len(), "feed cache loaded");
        Self { path, entries: Mutex::new(entries), io: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, feed_url: &str) -> Option<CacheEntry> {
        self.lock_entries().get(feed_url).cloned()
    }

    pub fn put(&self, feed_url: &str, entry: CacheEntry) -> Result<(), CacheError> {
        self.lock_entries().insert(feed_url.to_string(), entry);
        self.flush()
    }

    pub fn remove(&self, feed_url: &str) -> Result<bool, CacheError> {
        let removed = self.lock_entries().remove(feed_url).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    pub fn clear(&self) -> Result<usize, CacheError> {
        let n = {
            let mut entries = self.lock_entries();
            let n = entries.len();
            entries.clear();
            n
        };
        self.flush()?;
        Ok(n)
    }

    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        self.lock_entries().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    // Snapshot under the io lock so the last writer always persists the latest map.
    fn flush(&self) -> Result<(), CacheError> {
        let _io = self.io.lock().unwrap_or_else(|p| p.into_inner());
        let snapshot = serde_json::to_string_pretty(&*self.lock_entries())?;
        let io_err = |source: io::Error| CacheError::Io { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, snapshot).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

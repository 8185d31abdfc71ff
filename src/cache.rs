//! LRU file cache
//!
//! Keeps downloaded and uploaded binaries on local disk, keyed by fingerprint,
//! within a byte budget. Files are moved into the cache directory, never copied.
//!
//! Entries handed out as [`CachedFile`] are pinned: while any handle is alive
//! the entry is skipped by eviction, so a file is never deleted under a reader.
//! Pinned entries may push the total past the budget until they are released
//! and the next insertion evicts them. An evicted file that could not be
//! unlinked stays counted against the budget and is retried on later evictions.

use crate::fingerprint::Fingerprint;
use lru::LruCache;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

/// Prefix for in-flight files in the cache directory
const TEMP_PREFIX: &str = "tmp-";

/// A cached file on disk
#[derive(Debug)]
struct CacheEntry {
    path: PathBuf,
    size: u64,
}

/// Handle to a cached file; keeps the entry from being evicted while alive
#[derive(Debug, Clone)]
pub struct CachedFile(Arc<CacheEntry>);

impl CachedFile {
    pub fn path(&self) -> &Path {
        &self.0.path
    }

    pub fn size(&self) -> u64 {
        self.0.size
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.0.path)
    }
}

struct CacheInner {
    entries: LruCache<Fingerprint, Arc<CacheEntry>>,
    /// Evicted files still on disk
    orphans: Vec<(PathBuf, u64)>,
    total_size: u64,
}

/// Disk-backed LRU cache bounded by total file size
pub struct FileCache {
    dir: PathBuf,
    max_size: u64,
    inner: Mutex<CacheInner>,
    /// Owned root, removed when the cache is dropped
    _root: Option<TempDir>,
}

impl FileCache {
    /// Cache over an existing directory the caller owns
    pub fn new(dir: impl Into<PathBuf>, max_size: u64) -> Self {
        FileCache {
            dir: dir.into(),
            max_size,
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                orphans: Vec::new(),
                total_size: 0,
            }),
            _root: None,
        }
    }

    /// Cache over a fresh, empty temporary directory deleted on drop
    ///
    /// Removal happens in `Drop`, which also runs while a panic unwinds. A
    /// process that aborts or is killed leaves the directory behind.
    pub fn with_temp_dir(prefix: &str, max_size: u64) -> io::Result<Self> {
        let root = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!("Created cache directory {}", root.path().display());
        let mut cache = FileCache::new(root.path(), max_size);
        cache._root = Some(root);
        Ok(cache)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Byte budget
    pub fn capacity(&self) -> u64 {
        self.max_size
    }

    /// Allocate an empty temp file inside the cache directory
    ///
    /// The file is deleted on drop unless handed to [`FileCache::put_file`].
    pub fn temp_file(&self) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)
    }

    /// Look up a fingerprint, marking it most recently used
    pub fn get_file(&self, fingerprint: &Fingerprint) -> Option<CachedFile> {
        let mut inner = self.inner.lock();
        inner
            .entries
            .get(fingerprint)
            .map(|entry| CachedFile(Arc::clone(entry)))
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.lock().entries.contains(fingerprint)
    }

    /// Move `tmp` into the cache under `fingerprint`
    ///
    /// When the fingerprint is already cached the existing file wins (same
    /// content) and `tmp` is discarded. Least recently used unpinned entries
    /// are evicted until the total fits the budget.
    pub fn put_file(&self, fingerprint: &Fingerprint, tmp: NamedTempFile) -> io::Result<CachedFile> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.entries.get(fingerprint) {
            return Ok(CachedFile(Arc::clone(existing)));
        }

        let size = tmp.as_file().metadata()?.len();
        let path = self.dir.join(fingerprint.as_str());
        tmp.persist(&path).map_err(|e| e.error)?;

        // The rename replaced any orphan left at this path
        if let Some(pos) = inner.orphans.iter().position(|(orphan, _)| *orphan == path) {
            let (_, stale) = inner.orphans.swap_remove(pos);
            inner.total_size -= stale;
        }

        let entry = Arc::new(CacheEntry { path, size });
        inner.entries.put(fingerprint.clone(), Arc::clone(&entry));
        inner.total_size += size;

        self.evict(&mut inner, fingerprint);
        Ok(CachedFile(entry))
    }

    fn evict(&self, inner: &mut CacheInner, keep: &Fingerprint) {
        if inner.total_size > self.max_size && !inner.orphans.is_empty() {
            let CacheInner {
                orphans,
                total_size,
                ..
            } = &mut *inner;
            orphans.retain(|(path, size)| {
                if unlink(path) {
                    *total_size -= size;
                    false
                } else {
                    true
                }
            });
        }

        while inner.total_size > self.max_size {
            let victim = inner
                .entries
                .iter()
                .rev()
                .find(|(key, entry)| *key != keep && Arc::strong_count(entry) == 1)
                .map(|(key, _)| key.clone());

            let Some(victim) = victim else {
                debug!(
                    "Cache over budget ({} > {}) with only pinned entries left",
                    inner.total_size, self.max_size
                );
                break;
            };

            if let Some(entry) = inner.entries.pop(&victim) {
                if unlink(&entry.path) {
                    inner.total_size -= entry.size;
                    debug!("Evicted {} ({} bytes)", victim, entry.size);
                } else {
                    inner.orphans.push((entry.path.clone(), entry.size));
                }
            }
        }
    }

    /// Number of cached files
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of cached file sizes
    pub fn total_size(&self) -> u64 {
        self.inner.lock().total_size
    }
}

/// Delete a cache file; true once it is gone from disk
fn unlink(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => {
            warn!("Failed to delete evicted {}: {}", path.display(), e);
            false
        }
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("dir", &self.dir)
            .field("max_size", &self.max_size)
            .field("len", &self.len())
            .field("total_size", &self.total_size())
            .finish()
    }
}

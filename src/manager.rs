//! Binary manager
//!
//! Content-addressed binaries backed by an S3 bucket with a local LRU disk
//! cache in front. A binary is stored remotely under the MD5 of its bytes, so
//! uploads are idempotent and concurrent puts of the same content converge.

use crate::cache::{CachedFile, FileCache};
use crate::client::S3Client;
use crate::config::StoreConfig;
use crate::digest::{md5_file, store_and_digest};
use crate::error::{Result, StoreError};
use crate::fingerprint::Fingerprint;
use crate::gc::{GarbageCollector, S3GarbageCollector};
use crate::listing::Contents;
use crate::remote::{Presence, RemoteStore};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Prefix of the per-manager cache directory
const CACHE_DIR_PREFIX: &str = "binstore-cache.";

/// Operations every binary store provides
pub trait BlobStore {
    type Collector: GarbageCollector;

    /// Store the content of `input`, returning its binary
    fn put<R: Read>(&self, input: R) -> Result<Binary>;

    /// Binary for a fingerprint; `NotFound` when the remote has no such object
    fn get(&self, fingerprint: &Fingerprint) -> Result<Binary>;

    /// Remote length in bytes; 0 when the object is absent
    fn length(&self, fingerprint: &Fingerprint) -> Result<u64>;

    /// Delete the remote object; the local cache is left untouched
    fn remove(&self, fingerprint: &Fingerprint) -> Result<()>;

    /// Garbage collector for this store, created on first use
    fn gc(&self) -> Arc<Self::Collector>;
}

/// A stored binary backed by a local cache file
///
/// Holding a `Binary` keeps its cache file from being evicted.
#[derive(Debug, Clone)]
pub struct Binary {
    file: CachedFile,
    fingerprint: Fingerprint,
    repository_name: Arc<str>,
}

impl Binary {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    /// Local cache file holding the content
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> u64 {
        self.file.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn open(&self) -> io::Result<File> {
        self.file.open()
    }

    /// Read the whole content into memory
    pub fn read_to_vec(&self) -> io::Result<Vec<u8>> {
        std::fs::read(self.file.path())
    }
}

impl PartialEq for Binary {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint && self.repository_name == other.repository_name
    }
}

impl Eq for Binary {}

/// Binary known by fingerprint whose file and length are fetched on first use
#[derive(Debug)]
pub struct LazyBinary<'a> {
    fingerprint: Fingerprint,
    manager: &'a BinaryManager,
    file: OnceLock<Binary>,
    length: OnceLock<u64>,
}

impl<'a> LazyBinary<'a> {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Whether the file has been fetched already
    pub fn is_fetched(&self) -> bool {
        self.file.get().is_some()
    }

    /// Fetch the file through the manager; true when it carries the expected fingerprint
    pub fn fetch_file(&self) -> Result<bool> {
        let binary = self.binary()?;
        Ok(binary.fingerprint() == &self.fingerprint)
    }

    /// The underlying binary, fetching it if needed
    pub fn binary(&self) -> Result<&Binary> {
        if let Some(binary) = self.file.get() {
            return Ok(binary);
        }
        let binary = self.manager.get(&self.fingerprint)?;
        Ok(self.file.get_or_init(|| binary))
    }

    /// Remote length, fetched once
    pub fn length(&self) -> Result<u64> {
        if let Some(length) = self.length.get() {
            return Ok(*length);
        }
        let length = self.manager.length(&self.fingerprint)?;
        Ok(*self.length.get_or_init(|| length))
    }
}

/// Binary manager storing content in an S3 bucket
pub struct BinaryManager {
    repository_name: Arc<str>,
    cache: FileCache,
    remote: Arc<dyn RemoteStore>,
    collector: OnceLock<Arc<S3GarbageCollector>>,
}

impl BinaryManager {
    /// Connect to the configured bucket, creating it if it does not exist
    pub fn initialize(repository_name: &str, config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let cache_size = config.cache_size_bytes()?;
        let client = S3Client::new(config)?;
        if client.create_bucket()? {
            info!("Created bucket {}", config.bucket);
        }
        Self::with_remote(repository_name, cache_size, Arc::new(client))
    }

    /// Manager over any remote store, with a fresh cache directory
    pub fn with_remote(
        repository_name: &str,
        cache_size: u64,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self> {
        let cache = FileCache::with_temp_dir(CACHE_DIR_PREFIX, cache_size)?;
        info!(
            "Binary manager for repository {} on bucket {}, cache {} ({} bytes)",
            repository_name,
            remote.bucket(),
            cache.dir().display(),
            cache_size
        );
        Ok(BinaryManager {
            repository_name: Arc::from(repository_name),
            cache,
            remote,
            collector: OnceLock::new(),
        })
    }

    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    pub fn bucket(&self) -> &str {
        self.remote.bucket()
    }

    /// Local cache, for statistics
    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Every object in the bucket (first listing page)
    pub fn list(&self) -> Result<Vec<Contents>> {
        self.remote.list_objects()
    }

    /// Handle that defers fetching until the content or length is needed
    pub fn lazy(&self, fingerprint: Fingerprint) -> LazyBinary<'_> {
        LazyBinary {
            fingerprint,
            manager: self,
            file: OnceLock::new(),
            length: OnceLock::new(),
        }
    }

    fn binary(&self, file: CachedFile, fingerprint: Fingerprint) -> Binary {
        Binary {
            file,
            fingerprint,
            repository_name: Arc::clone(&self.repository_name),
        }
    }
}

impl BlobStore for BinaryManager {
    type Collector = S3GarbageCollector;

    fn put<R: Read>(&self, mut input: R) -> Result<Binary> {
        let mut tmp = self.cache.temp_file()?;
        let fingerprint = store_and_digest(&mut input, tmp.as_file_mut())?;
        drop(input);

        let file = self.cache.put_file(&fingerprint, tmp)?;

        match self.remote.head_object(fingerprint.as_str())? {
            Presence::Present { .. } => {
                debug!("Binary {} already stored remotely", fingerprint);
            }
            Presence::Absent => {
                let stored = self.remote.put_file(file.path())?;
                if stored != fingerprint {
                    return Err(StoreError::Io(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "cache file for {} changed before upload (now {})",
                            fingerprint, stored
                        ),
                    )));
                }
            }
        }

        Ok(self.binary(file, fingerprint))
    }

    fn get(&self, fingerprint: &Fingerprint) -> Result<Binary> {
        if let Some(file) = self.cache.get_file(fingerprint) {
            return Ok(self.binary(file, fingerprint.clone()));
        }

        let mut tmp = self.cache.temp_file()?;
        let written = self.remote.get_object(fingerprint.as_str(), tmp.as_file_mut())?;

        // The temp file is dropped, and unlinked, on mismatch
        let actual = md5_file(tmp.path())?;
        if actual != *fingerprint {
            warn!("Fetched {} but content hashes to {}", fingerprint, actual);
            return Err(StoreError::DigestMismatch {
                expected: fingerprint.to_string(),
                actual: actual.to_string(),
            });
        }
        debug!("Fetched {} ({} bytes) into the cache", fingerprint, written);

        let file = self.cache.put_file(fingerprint, tmp)?;
        Ok(self.binary(file, fingerprint.clone()))
    }

    fn length(&self, fingerprint: &Fingerprint) -> Result<u64> {
        match self.remote.head_object(fingerprint.as_str())? {
            Presence::Present { content_length } => Ok(content_length),
            Presence::Absent => Ok(0),
        }
    }

    fn remove(&self, fingerprint: &Fingerprint) -> Result<()> {
        self.remote.delete_object(fingerprint.as_str())?;
        Ok(())
    }

    fn gc(&self) -> Arc<S3GarbageCollector> {
        Arc::clone(
            self.collector
                .get_or_init(|| Arc::new(S3GarbageCollector::new(Arc::clone(&self.remote)))),
        )
    }
}

impl std::fmt::Debug for BinaryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryManager")
            .field("repository_name", &self.repository_name)
            .field("bucket", &self.remote.bucket())
            .field("cache", &self.cache)
            .finish()
    }
}

//! Shared helpers for integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use s3_binstore::{
    md5_file, Contents, Fingerprint, Presence, Removal, RemoteStore, Result, StoreError,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory bucket that counts remote calls
#[derive(Default)]
pub struct MemoryBucket {
    name: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    pub heads: AtomicUsize,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MemoryBucket {
    pub fn new(name: &str) -> Self {
        MemoryBucket {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Store bytes directly, bypassing the counters
    pub fn insert(&self, bytes: &[u8]) -> Fingerprint {
        let fingerprint = s3_binstore::digest::digest_reader(&mut &bytes[..]).unwrap();
        self.objects
            .lock()
            .insert(fingerprint.to_string(), bytes.to_vec());
        fingerprint
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl RemoteStore for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    fn head_object(&self, key: &str) -> Result<Presence> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        Ok(match self.objects.lock().get(key) {
            Some(bytes) => Presence::Present {
                content_length: bytes.len() as u64,
            },
            None => Presence::Absent,
        })
    }

    fn get_object(&self, key: &str, sink: &mut File) -> Result<u64> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .objects
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        sink.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    fn put_file(&self, path: &Path) -> Result<Fingerprint> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let key = md5_file(path)?;
        let bytes = std::fs::read(path)?;
        self.objects.lock().insert(key.to_string(), bytes);
        Ok(key)
    }

    fn delete_object(&self, key: &str) -> Result<Removal> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(match self.objects.lock().remove(key) {
            Some(_) => Removal::Deleted,
            None => Removal::AlreadyAbsent,
        })
    }

    fn list_objects(&self) -> Result<Vec<Contents>> {
        Ok(self
            .objects
            .lock()
            .iter()
            .map(|(key, bytes)| Contents {
                key: key.clone(),
                etag: key.clone(),
                size: bytes.len() as u64,
                ..Default::default()
            })
            .collect())
    }

    fn bucket_exists(&self) -> Result<bool> {
        Ok(true)
    }

    fn create_bucket(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Bucket whose every call fails as if the server answered 503
pub struct FailingBucket;

impl FailingBucket {
    fn failure() -> StoreError {
        StoreError::RemoteFailure {
            status: 503,
            body: "SlowDown".to_string(),
        }
    }
}

impl RemoteStore for FailingBucket {
    fn bucket(&self) -> &str {
        "failing"
    }

    fn head_object(&self, _key: &str) -> Result<Presence> {
        Err(Self::failure())
    }

    fn get_object(&self, _key: &str, sink: &mut File) -> Result<u64> {
        sink.write_all(b"partial")?;
        Err(Self::failure())
    }

    fn put_file(&self, _path: &Path) -> Result<Fingerprint> {
        Err(Self::failure())
    }

    fn delete_object(&self, _key: &str) -> Result<Removal> {
        Err(Self::failure())
    }

    fn list_objects(&self) -> Result<Vec<Contents>> {
        Err(Self::failure())
    }

    fn bucket_exists(&self) -> Result<bool> {
        Ok(false)
    }

    fn create_bucket(&self) -> Result<bool> {
        Err(Self::failure())
    }
}

/// Bucket that answers every download with a captive-portal page
pub struct LyingBucket;

impl RemoteStore for LyingBucket {
    fn bucket(&self) -> &str {
        "lying"
    }

    fn head_object(&self, _key: &str) -> Result<Presence> {
        Ok(Presence::Present { content_length: 18 })
    }

    fn get_object(&self, _key: &str, sink: &mut File) -> Result<u64> {
        sink.write_all(b"<html>proxy</html>")?;
        Ok(18)
    }

    fn put_file(&self, path: &Path) -> Result<Fingerprint> {
        Ok(md5_file(path)?)
    }

    fn delete_object(&self, _key: &str) -> Result<Removal> {
        Ok(Removal::AlreadyAbsent)
    }

    fn list_objects(&self) -> Result<Vec<Contents>> {
        Ok(Vec::new())
    }

    fn bucket_exists(&self) -> Result<bool> {
        Ok(true)
    }

    fn create_bucket(&self) -> Result<bool> {
        Ok(false)
    }
}

/// Files in `dir` that are not finished cache entries
pub fn temp_files_in(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !s3_binstore::is_well_formed(name))
        .collect()
}

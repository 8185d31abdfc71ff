//! Remote bucket interface
//!
//! The manager and the garbage collector only talk to a bucket through
//! [`RemoteStore`]; [`crate::client::S3Client`] is the HTTP implementation.

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::listing::Contents;
use std::fs::File;
use std::path::Path;

/// Result of a HEAD request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Object exists; carries its `Content-Length`
    Present { content_length: u64 },
    Absent,
}

impl Presence {
    pub fn is_present(&self) -> bool {
        matches!(self, Presence::Present { .. })
    }
}

/// Result of a DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// Nothing was stored under the key; treated as success
    AlreadyAbsent,
}

/// Operations against one bucket
pub trait RemoteStore: Send + Sync {
    /// Bucket this store writes to
    fn bucket(&self) -> &str;

    /// HEAD `/<key>`
    fn head_object(&self, key: &str) -> Result<Presence>;

    /// GET `/<key>`, streaming the body into `sink`; returns bytes written
    ///
    /// A missing object is `StoreError::NotFound`.
    fn get_object(&self, key: &str, sink: &mut File) -> Result<u64>;

    /// PUT the file under the MD5 of its content; returns that key
    fn put_file(&self, path: &Path) -> Result<Fingerprint>;

    /// DELETE `/<key>`
    fn delete_object(&self, key: &str) -> Result<Removal>;

    /// GET `/`: every object in the bucket (first page only)
    fn list_objects(&self) -> Result<Vec<Contents>>;

    /// Whether the bucket exists
    fn bucket_exists(&self) -> Result<bool>;

    /// PUT `/`; `false` when the bucket already existed or creation was refused
    fn create_bucket(&self) -> Result<bool>;
}

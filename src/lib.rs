//! # s3-binstore - Content-Addressed Binary Store on S3
//!
//! `s3-binstore` stores opaque binaries in an S3-compatible bucket under the
//! MD5 of their content, with a bounded local disk cache in front:
//!
//! - **Content addressing**: the fingerprint is both the cache key and the remote key
//! - **Idempotent uploads**: a HEAD request skips the PUT when the object exists
//! - **LRU disk cache** with a byte budget parsed from strings like `"100M"`
//! - **Mark-and-sweep GC** over the bucket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use s3_binstore::{BinaryManager, BlobStore, Credentials, Result, StoreConfig};
//!
//! # fn main() -> Result<()> {
//! let config = StoreConfig::new(
//!     "nuxeo.demo.scality.com",
//!     Credentials::new("nuxeo2011", "s3cr3t"),
//!     "100M",
//!     "demo.scality.com",
//! );
//! let manager = BinaryManager::initialize("default", &config)?;
//!
//! let binary = manager.put(&b"abcdef"[..])?;
//! assert_eq!(binary.fingerprint().as_str(), "e80b5017098950fc58aad83c8c14978e");
//!
//! let again = manager.get(binary.fingerprint())?;
//! assert_eq!(again.read_to_vec()?, b"abcdef");
//! assert_eq!(manager.length(binary.fingerprint())?, 6);
//! # Ok(())
//! # }
//! ```
//!
//! ## Garbage Collection
//!
//! ```rust,no_run
//! use s3_binstore::{BinaryManager, BlobStore, Fingerprint, GarbageCollector, Result};
//!
//! # fn run(manager: &BinaryManager, live: &[Fingerprint]) -> Result<()> {
//! let gc = manager.gc();
//! gc.start()?;
//! for fingerprint in live {
//!     gc.mark(fingerprint)?;
//! }
//! let status = gc.stop(true)?;
//! println!("collected {} objects", status.num_collected);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod fingerprint;
pub mod gc;
pub mod listing;
pub mod manager;
pub mod remote;
pub mod signer;

pub use crate::cache::{CachedFile, FileCache};
pub use crate::client::S3Client;
pub use crate::config::StoreConfig;
pub use crate::digest::{md5_file, store_and_digest};
pub use crate::error::{Result, StoreError};
pub use crate::fingerprint::{is_well_formed, Fingerprint};
pub use crate::gc::{GarbageCollector, GcStatus, S3GarbageCollector};
pub use crate::listing::{decode_listing, Contents, ListBucketResult};
pub use crate::manager::{Binary, BinaryManager, BlobStore, LazyBinary};
pub use crate::remote::{Presence, Removal, RemoteStore};
pub use crate::signer::{
    format_size, parse_size, Credentials, HttpMethod, RequestParts, SignedHeaders, Signer,
};

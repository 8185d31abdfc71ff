//! Bucket listing decoder
//!
//! Decodes the `ListBucketResult` document returned by `GET /` on a bucket.
//! Elements that are not modelled here are skipped.

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};

/// Decoded bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBucketResult {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,

    #[serde(rename = "Prefix", default)]
    pub prefix: Option<String>,

    #[serde(rename = "Marker", default)]
    pub marker: Option<String>,

    #[serde(rename = "MaxKeys", default)]
    pub max_keys: Option<u32>,

    /// Set when the server returned only the first page
    #[serde(rename = "IsTruncated", default)]
    pub is_truncated: bool,

    /// Objects in listing order
    #[serde(rename = "Contents", default)]
    pub contents: Vec<Contents>,
}

/// One listed object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contents {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "LastModified", default)]
    pub last_modified: Option<String>,

    /// Entity tag with surrounding quotes removed
    #[serde(rename = "ETag", default)]
    pub etag: String,

    #[serde(rename = "Size", default)]
    pub size: u64,

    #[serde(rename = "Owner", default)]
    pub owner: Option<Owner>,

    #[serde(rename = "StorageClass", default)]
    pub storage_class: Option<String>,
}

impl Contents {
    /// The entity tag as a fingerprint, if it is one
    ///
    /// Multipart uploads produce tags like `<hex>-<parts>` that are not.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        Fingerprint::parse(&self.etag).ok()
    }
}

/// Object owner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,

    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
}

/// Decode a `ListBucketResult` XML document
pub fn decode_listing(xml: &str) -> Result<ListBucketResult> {
    let mut result: ListBucketResult = quick_xml::de::from_str(xml)?;
    for contents in &mut result.contents {
        let trimmed = contents.etag.trim().trim_matches('"');
        if trimmed.len() != contents.etag.len() {
            contents.etag = trimmed.to_string();
        }
    }
    Ok(result)
}

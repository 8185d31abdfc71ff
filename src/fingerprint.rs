//! Content fingerprints
//!
//! A fingerprint is the lowercase 32-hex MD5 digest of an object's bytes. It is
//! the remote object key, the local cache key and the handle given to callers.

use crate::error::{Result, StoreError};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn md5_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[0-9a-f]{32}$").expect("valid fingerprint pattern"))
}

/// Check whether `value` is a well-formed fingerprint (`[0-9a-f]{32}`)
pub fn is_well_formed(value: &str) -> bool {
    md5_pattern().is_match(value)
}

/// Lowercase 32-hex MD5 digest identifying an object by its content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a fingerprint, rejecting anything that is not lowercase 32-hex
    pub fn parse(value: &str) -> Result<Self> {
        if is_well_formed(value) {
            Ok(Fingerprint(value.to_string()))
        } else {
            Err(StoreError::InvalidFingerprint(value.to_string()))
        }
    }

    /// Build a fingerprint from a raw 16-byte MD5 digest
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        debug_assert_eq!(digest.len(), 16);
        Fingerprint(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Fingerprint::parse(s)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Store configuration
//!
//! Configuration is an explicit value handed to the manager. It can be read
//! from TOML or from a flat property map; nothing is looked up ambiently.

use crate::error::{Result, StoreError};
use crate::signer::{parse_size, Credentials};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const BUCKET_KEY: &str = "binstore.bucket";
pub const ACCESS_KEY_ID_KEY: &str = "binstore.awsid";
pub const SECRET_ACCESS_KEY_KEY: &str = "binstore.awssecret";
pub const CACHE_SIZE_KEY: &str = "binstore.cache.size";
pub const HOST_BASE_KEY: &str = "binstore.host.name";
pub const ENDPOINT_KEY: &str = "binstore.endpoint";
pub const TIMEOUT_KEY: &str = "binstore.timeout.secs";

/// Default per-request deadline
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Connection and cache settings for one binary store
#[derive(Clone, Deserialize)]
pub struct StoreConfig {
    /// Bucket name; the leftmost DNS label of every request host
    pub bucket: String,

    pub access_key_id: String,

    pub secret_access_key: String,

    /// Local cache budget, e.g. `"100M"`
    pub cache_size: String,

    /// Host the bucket is a subdomain of, e.g. `demo.scality.com`
    pub host_base: String,

    /// Send requests here instead of `http://<bucket>.<host_base>`
    ///
    /// The `Host` header still names the virtual host.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl StoreConfig {
    pub fn new(
        bucket: impl Into<String>,
        credentials: Credentials,
        cache_size: impl Into<String>,
        host_base: impl Into<String>,
    ) -> Self {
        StoreConfig {
            bucket: bucket.into(),
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            cache_size: cache_size.into(),
            host_base: host_base.into(),
            endpoint: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Read `binstore.*` properties
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| {
            properties
                .get(key)
                .cloned()
                .ok_or_else(|| StoreError::Config(format!("missing property {}", key)))
        };

        let request_timeout_secs = match properties.get(TIMEOUT_KEY) {
            Some(value) => value.trim().parse().map_err(|_| {
                StoreError::Config(format!("{} is not a number: '{}'", TIMEOUT_KEY, value))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let config = StoreConfig {
            bucket: required(BUCKET_KEY)?,
            access_key_id: required(ACCESS_KEY_ID_KEY)?,
            secret_access_key: required(SECRET_ACCESS_KEY_KEY)?,
            cache_size: required(CACHE_SIZE_KEY)?,
            host_base: required(HOST_BASE_KEY)?,
            endpoint: properties.get(ENDPOINT_KEY).cloned(),
            request_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject empty required fields and unparsable sizes
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("bucket", &self.bucket),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("cache_size", &self.cache_size),
            ("host_base", &self.host_base),
        ] {
            if value.trim().is_empty() {
                return Err(StoreError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(StoreError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        self.cache_size_bytes()?;
        Ok(())
    }

    pub fn cache_size_bytes(&self) -> Result<u64> {
        parse_size(&self.cache_size)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.access_key_id, &self.secret_access_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `<bucket>.<host_base>`
    pub fn virtual_host(&self) -> String {
        format!("{}.{}", self.bucket, self.host_base)
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("cache_size", &self.cache_size)
            .field("host_base", &self.host_base)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

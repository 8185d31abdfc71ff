//! HTTP client for one S3-compatible bucket
//!
//! Requests use virtual-hosted-style addressing (`http://<bucket>.<hostBase>/<key>`)
//! and carry exactly two auth headers: `Authorization` and `x-amz-date`. No
//! `Date` header is sent.

use crate::config::StoreConfig;
use crate::digest::md5_file;
use crate::error::{Result, StoreError};
use crate::fingerprint::Fingerprint;
use crate::listing::{decode_listing, Contents};
use crate::remote::{Presence, Removal, RemoteStore};
use crate::signer::{HttpMethod, RequestParts, Signer};
use reqwest::blocking::{Body, Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HOST};
use reqwest::{Method, StatusCode};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Content type signed and sent with uploads
const DEFAULT_CONTENT_TYPE: &str = "";

/// Blocking S3 client bound to one bucket
#[derive(Debug)]
pub struct S3Client {
    http: Client,
    signer: Signer,
    bucket: String,
    virtual_host: String,
    base_url: String,
    /// Set when requests are routed to an explicit endpoint
    override_host: bool,
}

impl S3Client {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        let virtual_host = config.virtual_host();
        let (base_url, override_host) = match &config.endpoint {
            Some(endpoint) => (endpoint.trim_end_matches('/').to_string(), true),
            None => (format!("http://{}", virtual_host), false),
        };
        debug!("S3 client for bucket {} at {}", config.bucket, base_url);

        Ok(S3Client {
            http,
            signer: Signer::new(config.credentials()),
            bucket: config.bucket.clone(),
            virtual_host,
            base_url,
            override_host,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: HttpMethod, key: &str) -> Result<RequestBuilder> {
        let mut parts = RequestParts::new(method, &self.bucket, key);
        if method == HttpMethod::Put {
            parts.content_type = DEFAULT_CONTENT_TYPE;
        }
        let signed = self.signer.sign_now(&parts)?;

        let http_method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Delete => Method::DELETE,
        };
        let url = format!("{}/{}", self.base_url, key);
        debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(http_method, url)
            .header(AUTHORIZATION, signed.authorization)
            .header("x-amz-date", signed.amz_date);
        if self.override_host {
            builder = builder.header(HOST, &self.virtual_host);
        }
        Ok(builder)
    }

    /// HEAD the object and return its `Content-Length`; 0 when absent
    pub fn content_length(&self, key: &str) -> Result<u64> {
        match self.head_object(key)? {
            Presence::Present { content_length } => Ok(content_length),
            Presence::Absent => Ok(0),
        }
    }
}

/// Turn an unexpected response into `RemoteFailure`, keeping the body
fn remote_failure(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    debug!("Remote failure {}: {}", status, body);
    StoreError::RemoteFailure { status, body }
}

fn header_content_length(response: &Response) -> Result<u64> {
    let Some(value) = response.headers().get(CONTENT_LENGTH) else {
        return Ok(0);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| StoreError::RemoteFailure {
            status: response.status().as_u16(),
            body: format!("invalid Content-Length: {:?}", value),
        })
}

impl RemoteStore for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn head_object(&self, key: &str) -> Result<Presence> {
        let response = self.request(HttpMethod::Head, key)?.send()?;
        match response.status() {
            StatusCode::OK => Ok(Presence::Present {
                content_length: header_content_length(&response)?,
            }),
            StatusCode::NOT_FOUND => {
                debug!("Object {} does not exist", key);
                Ok(Presence::Absent)
            }
            _ => Err(remote_failure(response)),
        }
    }

    fn get_object(&self, key: &str, sink: &mut File) -> Result<u64> {
        let mut response = self.request(HttpMethod::Get, key)?.send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(remote_failure(response));
        }
        let written = response.copy_to(sink)?;
        debug!("Downloaded {} ({} bytes)", key, written);
        Ok(written)
    }

    fn put_file(&self, path: &Path) -> Result<Fingerprint> {
        let key = md5_file(path)?;
        let body = Body::from(File::open(path)?);
        let response = self
            .request(HttpMethod::Put, key.as_str())?
            .body(body)
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Upload of {} failed: {}", key, status);
            return Err(StoreError::UploadFailed {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }
        debug!("File {} was stored as {}", path.display(), key);
        Ok(key)
    }

    fn delete_object(&self, key: &str) -> Result<Removal> {
        let response = self.request(HttpMethod::Delete, key)?.send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Object {} does not exist", key);
            return Ok(Removal::AlreadyAbsent);
        }
        if !status.is_success() {
            return Err(remote_failure(response));
        }
        info!("Object {} deleted", key);
        Ok(Removal::Deleted)
    }

    fn list_objects(&self) -> Result<Vec<Contents>> {
        let response = self.request(HttpMethod::Get, "")?.send()?;
        if !response.status().is_success() {
            return Err(remote_failure(response));
        }
        let xml = response.text()?;
        let listing = decode_listing(&xml)?;
        if listing.is_truncated {
            warn!(
                "Listing of bucket {} is truncated after {} objects; later pages are not fetched",
                self.bucket,
                listing.contents.len()
            );
        }
        Ok(listing.contents)
    }

    fn bucket_exists(&self) -> Result<bool> {
        let response = self.request(HttpMethod::Get, "")?.send()?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => {
                debug!("Bucket {} does not exist", self.bucket);
                Ok(false)
            }
            status => {
                debug!("Bucket {} could not be checked: {}", self.bucket, status);
                Ok(false)
            }
        }
    }

    fn create_bucket(&self) -> Result<bool> {
        if self.bucket_exists()? {
            return Ok(false);
        }
        let response = self.request(HttpMethod::Put, "")?.send()?;
        let created = response.status() == StatusCode::OK;
        if created {
            info!("Bucket {} created", self.bucket);
        } else {
            warn!(
                "Bucket {} could not be created: {}",
                self.bucket,
                response.status()
            );
        }
        Ok(created)
    }
}

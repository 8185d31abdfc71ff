//! Error types for binary store operations

use thiserror::Error;

/// Binary store result type
pub type Result<T> = std::result::Result<T, StoreError>;

/// Binary store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed cache-size string
    #[error("Invalid size: '{0}'")]
    InvalidSize(String),

    /// Date string does not match the expected pattern
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Request signing failed
    #[error("Signature failure: {0}")]
    Signature(String),

    /// Remote object does not exist
    #[error("Object does not exist: {0}")]
    NotFound(String),

    /// Remote returned a non-success, non-404 status
    #[error("Remote request failed with status {status}: {body}")]
    RemoteFailure { status: u16, body: String },

    /// Remote refused an object upload
    #[error("Upload of {key} failed with status {status}")]
    UploadFailed { key: String, status: u16 },

    /// Downloaded bytes do not hash to the requested key
    #[error("Downloaded object {expected} hashes to {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Connection error or request deadline exceeded
    #[error("Remote transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bucket listing could not be decoded
    #[error("Invalid bucket listing: {0}")]
    ListDecode(#[from] quick_xml::DeError),

    /// Value is not a lowercase 32-hex MD5 digest
    #[error("Invalid fingerprint: '{0}'")]
    InvalidFingerprint(String),

    /// Missing or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// GC session already in progress
    #[error("Garbage collection already started")]
    AlreadyStarted,

    /// GC session not in progress
    #[error("Garbage collection not started")]
    NotStarted,
}

impl StoreError {
    /// True for any failure of the remote side, including timeouts.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StoreError::RemoteFailure { .. }
                | StoreError::UploadFailed { .. }
                | StoreError::DigestMismatch { .. }
                | StoreError::Transport(_)
        )
    }

    /// True when the remote object was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

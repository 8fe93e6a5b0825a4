//! Provider client abstraction
//!
//! The adapter never talks to the SDK directly. It asks a [`ClientFactory`] for
//! an [`ObjectStoreClient`] per call, which lets tests substitute an in-memory
//! double for the real network client.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use stowage_core::constants::NO_SUCH_BUCKET;
use stowage_core::StorageConfiguration;
use tokio::io::AsyncRead;

use crate::traits::StorageResult;

/// Object body as handed back by the provider.
pub type ObjectBody = Pin<Box<dyn AsyncRead + Send>>;

/// Error reported by the object-storage provider, keyed by HTTP status and
/// provider-specific error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// The bucket itself is missing. This is a configuration problem and is
    /// never treated as an absent object.
    pub fn is_bucket_not_found(&self) -> bool {
        self.code.as_deref() == Some(NO_SUCH_BUCKET)
    }

    pub fn is_object_not_found(&self) -> bool {
        self.status == Some(404) && !self.is_bucket_not_found()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (self.status, self.code.as_deref()) {
            (Some(status), Some(code)) => write!(f, " (status {}, code {})", status, code),
            (Some(status), None) => write!(f, " (status {})", status),
            (None, Some(code)) => write!(f, " (code {})", code),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Response headers relevant to metadata mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectHeaders {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    /// Last-modified time in whatever offset the provider reported.
    pub last_modified: Option<DateTime<FixedOffset>>,
}

pub struct GetObjectOutput {
    pub headers: ObjectHeaders,
    pub body: ObjectBody,
}

impl fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub body: Bytes,
}

/// Capabilities the adapter needs from an object-storage client.
///
/// Keys passed here are already normalized.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), ProviderError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<GetObjectOutput, ProviderError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError>;

    /// Metadata-only request.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHeaders, ProviderError>;

    /// Sign a GET request locally. No network round-trip.
    async fn presign_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ProviderError>;
}

/// Produces a client for the given configuration.
///
/// Each returned client is owned by a single adapter call and dropped when that
/// call (or, for content fetches, the returned stream) is done.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        config: &StorageConfiguration,
    ) -> StorageResult<Box<dyn ObjectStoreClient>>;
}

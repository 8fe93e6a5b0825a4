//! Storage abstraction trait
//!
//! This module defines the `RemoteStorage` contract and the error type every
//! operation reports through.

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use stowage_core::{FileStorageMetadata, FileStorageMetadataInfo};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::client::ProviderError;
use crate::stream::FileStream;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("File not found: {key}")]
    NotFound {
        key: String,
        #[source]
        source: ProviderError,
    },

    /// The configured bucket does not exist.
    #[error("Bucket not found: {bucket}")]
    BucketNotFound {
        bucket: String,
        #[source]
        source: ProviderError,
    },

    #[error("Storage backend error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Storage operation cancelled")]
    Cancelled,

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Classify a provider failure for the given bucket and key.
    pub fn from_provider(err: ProviderError, bucket: &str, key: &str) -> Self {
        if err.is_bucket_not_found() {
            StorageError::BucketNotFound {
                bucket: bucket.to_string(),
                source: err,
            }
        } else if err.is_object_not_found() {
            StorageError::NotFound {
                key: key.to_string(),
                source: err,
            }
        } else {
            StorageError::Provider(err)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    /// The underlying provider error, if the failure came from the provider.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            StorageError::NotFound { source, .. } | StorageError::BucketNotFound { source, .. } => {
                Some(source)
            }
            StorageError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Bytes to upload: an in-memory buffer or a reader consumed until EOF.
pub enum UploadSource {
    Bytes(Bytes),
    Reader(Pin<Box<dyn AsyncRead + Send>>),
}

impl UploadSource {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        UploadSource::Reader(Box::pin(reader))
    }

    /// Buffer the whole source. Uploads are single-request, never multipart.
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            UploadSource::Bytes(bytes) => Ok(bytes),
            UploadSource::Reader(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            UploadSource::Reader(_) => f.write_str("Reader"),
        }
    }
}

impl From<Bytes> for UploadSource {
    fn from(bytes: Bytes) -> Self {
        UploadSource::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(data: Vec<u8>) -> Self {
        UploadSource::Bytes(Bytes::from(data))
    }
}

impl From<&'static [u8]> for UploadSource {
    fn from(data: &'static [u8]) -> Self {
        UploadSource::Bytes(Bytes::from_static(data))
    }
}

impl From<String> for UploadSource {
    fn from(data: String) -> Self {
        UploadSource::Bytes(Bytes::from(data))
    }
}

/// Metadata of a fetched object paired with its open content stream.
///
/// The receiver owns the stream; dropping it releases the provider connection.
#[derive(Debug)]
pub struct FileStorageResponse {
    pub metadata: FileStorageMetadata,
    pub stream: FileStream,
}

impl FileStorageResponse {
    pub fn into_parts(self) -> (FileStorageMetadata, FileStream) {
        (self.metadata, self.stream)
    }
}

/// Remote file storage contract
///
/// Keys may use `\` or `/` as separator; both are sent to the provider as `/`.
/// Operations that hit the network observe the cancellation token.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Upload `source` under `metadata.file_name`.
    ///
    /// Cache-control, content-disposition and content-encoding are only sent
    /// when non-empty. Failures are not retried.
    async fn save(
        &self,
        source: UploadSource,
        metadata: &FileStorageMetadataInfo,
        cancel: &CancellationToken,
    ) -> StorageResult<()>;

    /// Upload with only a content type.
    async fn save_as(
        &self,
        source: UploadSource,
        file_name: &str,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        let metadata = FileStorageMetadataInfo::new(file_name, content_type);
        self.save(source, &metadata, cancel).await
    }

    /// Fetch an object and its metadata.
    ///
    /// A missing object is an error (`StorageError::NotFound`), not an empty result.
    async fn get_content(
        &self,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<FileStorageResponse>;

    /// Delete an object. Deleting an absent object succeeds, and an empty key
    /// is a no-op.
    async fn delete(&self, file_name: &str, cancel: &CancellationToken) -> StorageResult<()>;

    /// Check whether an object exists. A missing bucket is an error.
    async fn exists(&self, file_name: &str, cancel: &CancellationToken) -> StorageResult<bool>;

    /// Fetch object metadata, `None` when the object is absent. A missing
    /// bucket is an error.
    async fn get_metadata(
        &self,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Option<FileStorageMetadata>>;

    /// Generate a presigned GET URL valid for `expires_in`.
    ///
    /// Signing is local; no request is sent to the provider.
    async fn get_presigned_url(&self, file_name: &str, expires_in: Duration)
        -> StorageResult<String>;
}

//! Image pipeline integration traits
//!
//! The hosting pipeline walks its registered providers, picks the first whose
//! `is_match` accepts the request, and asks it for a resolver.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::Uri;
use std::time::Duration;
use stowage_core::FileStorageMetadata;
use stowage_storage::FileStream;
use tokio_util::sync::CancellationToken;

use crate::cache_control::parse_max_age;
use crate::error::ImageResult;

/// Caching metadata of a source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub last_write_time_utc: DateTime<Utc>,
    pub content_type: String,
    /// `max-age` from the stored cache-control header, if present and parsable.
    pub cache_control_max_age: Option<Duration>,
}

impl ImageMetadata {
    pub fn from_storage(metadata: &FileStorageMetadata) -> Self {
        Self {
            last_write_time_utc: metadata.last_modified_utc,
            content_type: metadata.content_type.clone(),
            cache_control_max_age: metadata.cache_control.as_deref().and_then(parse_max_age),
        }
    }
}

/// Source of images for a slice of the request path space.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Whether this provider handles the request.
    fn is_match(&self, uri: &Uri) -> bool;

    fn is_valid_request(&self, _uri: &Uri) -> bool {
        true
    }

    /// Look up the image for the request. `None` declines the request.
    async fn get(
        &self,
        uri: &Uri,
        cancel: &CancellationToken,
    ) -> ImageResult<Option<Box<dyn ImageResolver>>>;
}

/// Handle on one resolved source image.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    fn metadata(&self) -> &ImageMetadata;

    /// Open the image content. The caller owns the returned stream.
    async fn open_read(&self, cancel: &CancellationToken) -> ImageResult<FileStream>;
}

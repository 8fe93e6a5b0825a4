use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, OnceLock};
use stowage_core::FileStorageMetadata;
use stowage_storage::{FileStream, RemoteStorage};
use tokio_util::sync::CancellationToken;

use crate::error::{ImageError, ImageResult};
use crate::traits::{ImageMetadata, ImageResolver};

/// Resolver for an image whose metadata was found in remote storage.
pub struct StorageImageResolver {
    storage: Arc<dyn RemoteStorage>,
    key: String,
    storage_metadata: FileStorageMetadata,
    metadata: OnceLock<ImageMetadata>,
}

impl StorageImageResolver {
    pub fn new(
        storage: Arc<dyn RemoteStorage>,
        key: impl Into<String>,
        storage_metadata: FileStorageMetadata,
    ) -> Self {
        Self {
            storage,
            key: key.into(),
            storage_metadata,
            metadata: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage_metadata(&self) -> &FileStorageMetadata {
        &self.storage_metadata
    }
}

#[async_trait]
impl ImageResolver for StorageImageResolver {
    fn metadata(&self) -> &ImageMetadata {
        self.metadata
            .get_or_init(|| ImageMetadata::from_storage(&self.storage_metadata))
    }

    async fn open_read(&self, cancel: &CancellationToken) -> ImageResult<FileStream> {
        match self.storage.get_content(&self.key, cancel).await {
            Ok(response) => Ok(response.stream),
            // Deleted between the metadata lookup and this fetch; not retried.
            Err(e) if e.is_not_found() => {
                tracing::error!(key = %self.key, "Image disappeared before it could be read");
                Err(ImageError::Vanished(self.key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for StorageImageResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageImageResolver")
            .field("key", &self.key)
            .field("storage_metadata", &self.storage_metadata)
            .finish_non_exhaustive()
    }
}

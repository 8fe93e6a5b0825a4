//! S3-backed implementation of the `RemoteStorage` contract.

use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use stowage_core::{FileStorageMetadata, FileStorageMetadataInfo, StorageConfiguration};
use tokio_util::sync::CancellationToken;

use crate::client::{ClientFactory, ObjectHeaders, ObjectStoreClient, PutObjectRequest};
use crate::keys::encode_key;
use crate::stream::FileStream;
use crate::traits::{
    FileStorageResponse, RemoteStorage, StorageError, StorageResult, UploadSource,
};

/// Remote storage over an S3-compatible object store.
///
/// Holds only the immutable configuration and the client factory, so it can be
/// shared freely between tasks. Each call obtains its own client.
#[derive(Clone)]
pub struct S3RemoteStorage {
    config: Arc<StorageConfiguration>,
    client_factory: Arc<dyn ClientFactory>,
}

impl S3RemoteStorage {
    /// Create a storage adapter backed by the AWS SDK client.
    #[cfg(feature = "storage-s3")]
    pub fn new(config: StorageConfiguration) -> StorageResult<Self> {
        Self::with_client_factory(config, Arc::new(crate::s3::S3ClientFactory::new()))
    }

    /// Create a storage adapter with a custom client factory.
    ///
    /// The configuration is validated here, before any network call.
    pub fn with_client_factory(
        config: StorageConfiguration,
        client_factory: Arc<dyn ClientFactory>,
    ) -> StorageResult<Self> {
        config
            .validate()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3RemoteStorage {
            config: Arc::new(config),
            client_factory,
        })
    }

    pub fn config(&self) -> &StorageConfiguration {
        &self.config
    }

    fn bucket(&self) -> &str {
        self.config.bucket()
    }

    async fn client(&self) -> StorageResult<Box<dyn ObjectStoreClient>> {
        self.client_factory.create(&self.config).await
    }

    /// Head request shared by `exists` and `get_metadata`. `None` means the
    /// object is absent; a missing bucket stays an error.
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectHeaders>> {
        let client = self.client().await?;
        match client.head_object(self.bucket(), key).await {
            Ok(headers) => Ok(Some(headers)),
            Err(e) if e.is_object_not_found() => Ok(None),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket(),
                    key = %key,
                    "S3 head failed"
                );
                Err(StorageError::from_provider(e, self.bucket(), key))
            }
        }
    }
}

/// Map provider headers onto the generic metadata record.
pub(crate) fn map_metadata(file_name: &str, headers: &ObjectHeaders) -> FileStorageMetadata {
    FileStorageMetadata {
        file_name: file_name.to_string(),
        content_type: headers.content_type.clone().unwrap_or_default(),
        content_length: headers.content_length.unwrap_or(0),
        cache_control: headers.cache_control.clone(),
        content_disposition: headers.content_disposition.clone(),
        content_encoding: headers.content_encoding.clone(),
        last_modified_utc: headers
            .last_modified
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default(),
    }
}

/// Race `operation` against the cancellation token.
async fn cancellable<T, F>(cancel: &CancellationToken, operation: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StorageError::Cancelled),
        result = operation => result,
    }
}

fn require_key<'a>(file_name: &'a str, operation: &str) -> StorageResult<std::borrow::Cow<'a, str>> {
    if file_name.is_empty() {
        return Err(StorageError::InvalidKey(format!(
            "{} requires a file name",
            operation
        )));
    }
    Ok(encode_key(file_name))
}

#[async_trait]
impl RemoteStorage for S3RemoteStorage {
    async fn save(
        &self,
        source: UploadSource,
        metadata: &FileStorageMetadataInfo,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        let key = require_key(&metadata.file_name, "save")?;
        let start = Instant::now();

        cancellable(cancel, async {
            let body = source.into_bytes().await?;
            let size = body.len() as u64;

            let request = PutObjectRequest {
                bucket: self.bucket().to_string(),
                key: key.to_string(),
                content_type: metadata.effective_content_type().to_string(),
                cache_control: metadata.cache_control().map(String::from),
                content_disposition: metadata.content_disposition().map(String::from),
                content_encoding: metadata.content_encoding().map(String::from),
                body,
            };

            let client = self.client().await?;
            client.put_object(request).await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket(),
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::from_provider(e, self.bucket(), &key)
            })?;

            tracing::info!(
                bucket = %self.bucket(),
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload successful"
            );

            Ok(())
        })
        .await
    }

    async fn get_content(
        &self,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<FileStorageResponse> {
        let key = require_key(file_name, "get_content")?;
        let start = Instant::now();

        cancellable(cancel, async {
            let client = self.client().await?;
            let output = client
                .get_object(self.bucket(), &key)
                .await
                .map_err(|e| {
                    if !e.is_object_not_found() {
                        tracing::error!(
                            error = %e,
                            bucket = %self.bucket(),
                            key = %key,
                            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                            "S3 download failed"
                        );
                    }
                    StorageError::from_provider(e, self.bucket(), &key)
                })?;

            let metadata = map_metadata(file_name, &output.headers);
            // The client must outlive the call; it is released with the stream.
            let stream = FileStream::new(output.body, output.headers.content_length).hold(client);

            tracing::debug!(
                bucket = %self.bucket(),
                key = %key,
                size_bytes = metadata.content_length,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 download opened"
            );

            Ok(FileStorageResponse { metadata, stream })
        })
        .await
    }

    async fn delete(&self, file_name: &str, cancel: &CancellationToken) -> StorageResult<()> {
        if file_name.is_empty() {
            return Ok(());
        }
        let key = encode_key(file_name);
        let start = Instant::now();

        cancellable(cancel, async {
            let client = self.client().await?;
            match client.delete_object(self.bucket(), &key).await {
                Ok(()) => {
                    tracing::info!(
                        bucket = %self.bucket(),
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 delete successful"
                    );
                    Ok(())
                }
                Err(e) if e.is_object_not_found() => {
                    tracing::debug!(
                        bucket = %self.bucket(),
                        key = %key,
                        "S3 delete skipped, object already absent"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket(),
                        key = %key,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "S3 delete failed"
                    );
                    Err(StorageError::from_provider(e, self.bucket(), &key))
                }
            }
        })
        .await
    }

    async fn exists(&self, file_name: &str, cancel: &CancellationToken) -> StorageResult<bool> {
        if file_name.is_empty() {
            return Ok(false);
        }
        let key = encode_key(file_name);
        cancellable(cancel, async { Ok(self.head(&key).await?.is_some()) }).await
    }

    async fn get_metadata(
        &self,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Option<FileStorageMetadata>> {
        if file_name.is_empty() {
            return Ok(None);
        }
        let key = encode_key(file_name);
        cancellable(cancel, async {
            let headers = self.head(&key).await?;
            Ok(headers.map(|h| map_metadata(file_name, &h)))
        })
        .await
    }

    async fn get_presigned_url(
        &self,
        file_name: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let key = require_key(file_name, "get_presigned_url")?;
        let client = self.client().await?;
        client
            .presign_get_object(self.bucket(), &key, expires_in)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket(),
                    key = %key,
                    "S3 presign failed"
                );
                StorageError::from_provider(e, self.bucket(), &key)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryObjectStore;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn storage(store: &InMemoryObjectStore) -> S3RemoteStorage {
        S3RemoteStorage::with_client_factory(StorageConfiguration::new("b"), store.factory())
            .unwrap()
    }

    #[test]
    fn test_rejects_invalid_configuration() {
        let store = InMemoryObjectStore::new();
        let result =
            S3RemoteStorage::with_client_factory(StorageConfiguration::new(""), store.factory());
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
        assert_eq!(store.clients_created(), 0);
    }

    #[test]
    fn test_map_metadata_converts_to_utc() {
        let offset = FixedOffset::east_opt(10 * 3600).unwrap();
        let local: DateTime<FixedOffset> = offset.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let headers = ObjectHeaders {
            content_type: Some("image/png".to_string()),
            content_length: Some(42),
            cache_control: Some("max-age=60".to_string()),
            last_modified: Some(local),
            ..ObjectHeaders::default()
        };

        let metadata = map_metadata("a\\b.png", &headers);
        assert_eq!(metadata.file_name, "a\\b.png");
        assert_eq!(metadata.content_type, "image/png");
        assert_eq!(metadata.content_length, 42);
        assert_eq!(
            metadata.last_modified_utc,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_map_metadata_defaults() {
        let metadata = map_metadata("k", &ObjectHeaders::default());
        assert_eq!(metadata.content_type, "");
        assert_eq!(metadata.content_length, 0);
        assert_eq!(metadata.last_modified_utc.timestamp(), 0);
    }

    #[tokio::test]
    async fn test_empty_keys_skip_the_provider() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        let storage = storage(&store);
        let cancel = CancellationToken::new();

        storage.delete("", &cancel).await.unwrap();
        assert!(!storage.exists("", &cancel).await.unwrap());
        assert!(storage.get_metadata("", &cancel).await.unwrap().is_none());
        assert_eq!(store.clients_created(), 0);

        let err = storage.get_content("", &cancel).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        let storage = storage(&store);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = storage.exists("a.txt", &cancel).await.unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert_eq!(store.clients_created(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_provider_call() {
        let store = InMemoryObjectStore::new().with_bucket("b");
        store.set_latency(Duration::from_secs(30));
        let storage = storage(&store);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = storage
            .save_as(b"late".as_slice().into(), "late.txt", "text/plain", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert!(!store.contains("b", "late.txt"));
        assert_eq!(store.open_clients(), 0);
    }
}

use crate::{RemoteStorage, S3RemoteStorage, StorageResult};
use std::sync::Arc;
use stowage_core::AppConfig;

/// Create the remote storage backend from configuration
#[cfg(feature = "storage-s3")]
pub fn create_storage(config: &AppConfig) -> StorageResult<Arc<dyn RemoteStorage>> {
    let storage = S3RemoteStorage::new(config.storage.clone())?;

    tracing::info!(
        bucket = %config.storage.bucket(),
        endpoint = %config.storage.service_url(),
        region = %config.storage.region(),
        static_credentials = config.storage.has_static_credentials(),
        "Remote storage configured"
    );

    Ok(Arc::new(storage))
}

/// Create a storage backend over the in-memory provider double
#[cfg(any(test, feature = "testing"))]
pub fn create_test_storage(
    bucket: &str,
) -> StorageResult<(Arc<dyn RemoteStorage>, crate::testing::InMemoryObjectStore)> {
    let store = crate::testing::InMemoryObjectStore::new().with_bucket(bucket);
    let storage = S3RemoteStorage::with_client_factory(
        stowage_core::StorageConfiguration::new(bucket),
        store.factory(),
    )?;
    Ok((Arc::new(storage), store))
}

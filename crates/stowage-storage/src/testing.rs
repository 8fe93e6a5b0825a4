//! In-memory provider double
//!
//! Simulates an S3 bucket closely enough to exercise the adapter without a
//! network: per-bucket object maps, provider error codes for missing buckets
//! and keys, injected faults, artificial latency and a count of open client
//! handles.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stowage_core::constants::NO_SUCH_BUCKET;
use stowage_core::StorageConfiguration;

use crate::client::{
    ClientFactory, GetObjectOutput, ObjectHeaders, ObjectStoreClient, ProviderError,
    PutObjectRequest,
};
use crate::traits::StorageResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Put,
    Get,
    Delete,
    Head,
    Presign,
}

/// A provider call as the double received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub operation: Operation,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub last_modified: DateTime<FixedOffset>,
}

impl StoredObject {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            last_modified: Utc::now().fixed_offset(),
        }
    }

    fn headers(&self) -> ObjectHeaders {
        ObjectHeaders {
            content_type: Some(self.content_type.clone()),
            content_length: Some(self.data.len() as u64),
            cache_control: self.cache_control.clone(),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            last_modified: Some(self.last_modified),
        }
    }
}

#[derive(Default)]
struct State {
    buckets: HashMap<String, HashMap<String, StoredObject>>,
    requests: Vec<RecordedRequest>,
    faults: VecDeque<ProviderError>,
    latency: Option<Duration>,
    clients_created: usize,
    open_clients: usize,
}

/// Shared in-memory object store. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.create_bucket(bucket);
        self
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.state
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default();
    }

    pub fn insert(&self, bucket: &str, key: &str, object: StoredObject) {
        self.state
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    /// Make the next provider call fail with `err`.
    pub fn fail_next(&self, err: ProviderError) {
        self.state.lock().unwrap().faults.push_back(err);
    }

    /// Delay every provider call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn clients_created(&self) -> usize {
        self.state.lock().unwrap().clients_created
    }

    /// Client handles created and not yet dropped.
    pub fn open_clients(&self) -> usize {
        self.state.lock().unwrap().open_clients
    }

    pub fn factory(&self) -> Arc<dyn ClientFactory> {
        Arc::new(InMemoryClientFactory {
            state: self.state.clone(),
        })
    }
}

struct InMemoryClientFactory {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl ClientFactory for InMemoryClientFactory {
    async fn create(
        &self,
        _config: &StorageConfiguration,
    ) -> StorageResult<Box<dyn ObjectStoreClient>> {
        {
            let mut state = self.state.lock().unwrap();
            state.clients_created += 1;
            state.open_clients += 1;
        }
        Ok(Box::new(InMemoryClient {
            state: self.state.clone(),
        }))
    }
}

struct InMemoryClient {
    state: Arc<Mutex<State>>,
}

impl Drop for InMemoryClient {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open_clients -= 1;
        }
    }
}

fn no_such_bucket(bucket: &str) -> ProviderError {
    ProviderError::new(format!("The specified bucket does not exist: {}", bucket))
        .with_status(404)
        .with_code(NO_SUCH_BUCKET)
}

fn no_such_key(key: &str, code: &str) -> ProviderError {
    ProviderError::new(format!("The specified key does not exist: {}", key))
        .with_status(404)
        .with_code(code)
}

impl InMemoryClient {
    /// Record the call, apply latency and pop any injected fault.
    async fn begin(&self, operation: Operation, bucket: &str, key: &str) -> Result<(), ProviderError> {
        let latency = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(RecordedRequest {
                operation,
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.state.lock().unwrap().faults.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn with_bucket<T>(
        &self,
        bucket: &str,
        f: impl FnOnce(&mut HashMap<String, StoredObject>) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let mut state = self.state.lock().unwrap();
        match state.buckets.get_mut(bucket) {
            Some(objects) => f(objects),
            None => Err(no_such_bucket(bucket)),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryClient {
    async fn put_object(&self, request: PutObjectRequest) -> Result<(), ProviderError> {
        self.begin(Operation::Put, &request.bucket, &request.key)
            .await?;
        let bucket = request.bucket.clone();
        self.with_bucket(&bucket, move |objects| {
            let object = StoredObject {
                data: request.body,
                content_type: request.content_type,
                cache_control: request.cache_control,
                content_disposition: request.content_disposition,
                content_encoding: request.content_encoding,
                last_modified: Utc::now().fixed_offset(),
            };
            objects.insert(request.key, object);
            Ok(())
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<GetObjectOutput, ProviderError> {
        self.begin(Operation::Get, bucket, key).await?;
        let object = self.with_bucket(bucket, |objects| {
            objects
                .get(key)
                .cloned()
                .ok_or_else(|| no_such_key(key, "NoSuchKey"))
        })?;
        Ok(GetObjectOutput {
            headers: object.headers(),
            body: Box::pin(Cursor::new(object.data)),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
        self.begin(Operation::Delete, bucket, key).await?;
        // S3 answers 204 whether or not the key existed.
        self.with_bucket(bucket, |objects| {
            objects.remove(key);
            Ok(())
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectHeaders, ProviderError> {
        self.begin(Operation::Head, bucket, key).await?;
        self.with_bucket(bucket, |objects| {
            objects
                .get(key)
                .map(StoredObject::headers)
                .ok_or_else(|| no_such_key(key, "NotFound"))
        })
    }

    async fn presign_get_object(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, ProviderError> {
        self.begin(Operation::Presign, bucket, key).await?;
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

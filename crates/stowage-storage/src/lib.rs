//! Stowage Storage Library
//!
//! This crate provides the `RemoteStorage` abstraction and its implementation
//! over an S3-compatible object store.
//!
//! # Layers
//!
//! - [`RemoteStorage`] is the contract callers use (save, get, delete, exists,
//!   metadata, presigned URL).
//! - [`S3RemoteStorage`] implements it by forwarding each operation to an
//!   [`ObjectStoreClient`] obtained from a [`ClientFactory`].
//! - [`s3::S3ClientFactory`] builds real AWS SDK clients; the `testing` module
//!   provides an in-memory double.
//!
//! # Not-found semantics
//!
//! `exists` and `get_metadata` turn a missing object into `false` / `None`,
//! and `delete` treats it as success. `get_content` reports it as
//! [`StorageError::NotFound`]. A missing bucket is always an error.

pub mod client;
pub mod factory;
pub mod keys;
pub mod remote;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod stream;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod traits;

// Re-export commonly used types
pub use client::{ClientFactory, ObjectStoreClient, ProviderError};
#[cfg(feature = "storage-s3")]
pub use factory::create_storage;
pub use keys::encode_key;
pub use remote::S3RemoteStorage;
pub use stream::FileStream;
pub use traits::{
    FileStorageResponse, RemoteStorage, StorageError, StorageResult, UploadSource,
};

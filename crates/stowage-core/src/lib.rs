//! Stowage Core Library
//!
//! This crate provides the configuration records and metadata value types
//! shared by the storage adapter, the image provider and the CLI.

pub mod config;
pub mod constants;
pub mod models;

// Re-export commonly used types
pub use config::{AppConfig, ImageProviderOptions, StorageConfiguration};
pub use models::{FileStorageMetadata, FileStorageMetadataInfo};

//! Stowage Images Library
//!
//! Lets an image-serving pipeline resolve source images straight from remote
//! storage. A request whose path falls under the configured prefix is mapped
//! to an object key; the provider checks the object's metadata and hands back
//! a resolver that exposes caching metadata and opens the content stream.

pub mod cache_control;
pub mod error;
pub mod provider;
pub mod resolver;
pub mod traits;

// Re-export commonly used types
pub use error::{ImageError, ImageResult};
pub use provider::StorageImageProvider;
pub use resolver::StorageImageResolver;
pub use traits::{ImageMetadata, ImageProvider, ImageResolver};

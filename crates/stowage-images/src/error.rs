use stowage_storage::StorageError;
use thiserror::Error;

/// Image provider errors
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid URL prefix: {0}")]
    InvalidUrlPrefix(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The object was present at lookup time but gone when its content was fetched.
    #[error("Image disappeared before it could be read: {0}")]
    Vanished(String),
}

pub type ImageResult<T> = Result<T, ImageError>;

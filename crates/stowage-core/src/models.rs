//! Metadata value types exchanged with the storage adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CONTENT_TYPE;

/// Metadata of a stored object, mapped from a provider head/get response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStorageMetadata {
    pub file_name: String,
    pub content_type: String,
    pub content_length: u64,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub last_modified_utc: DateTime<Utc>,
}

/// Write-side description of an upload.
///
/// The optional headers are only sent when non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStorageMetadataInfo {
    pub file_name: String,
    pub content_type: String,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
}

impl FileStorageMetadataInfo {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn with_content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }

    pub fn with_content_encoding(mut self, value: impl Into<String>) -> Self {
        self.content_encoding = Some(value.into());
        self
    }

    /// Content type to send, falling back to `application/octet-stream`.
    pub fn effective_content_type(&self) -> &str {
        if self.content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }

    pub fn cache_control(&self) -> Option<&str> {
        non_empty(&self.cache_control)
    }

    pub fn content_disposition(&self) -> Option<&str> {
        non_empty(&self.content_disposition)
    }

    pub fn content_encoding(&self) -> Option<&str> {
        non_empty(&self.content_encoding)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

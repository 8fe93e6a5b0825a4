//! Storage-backed image provider.

use async_trait::async_trait;
use http::Uri;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::sync::Arc;
use stowage_core::constants::URL_PREFIX_MARKER;
use stowage_core::ImageProviderOptions;
use stowage_storage::{RemoteStorage, S3RemoteStorage};
use tokio_util::sync::CancellationToken;

use crate::error::{ImageError, ImageResult};
use crate::resolver::StorageImageResolver;
use crate::traits::{ImageProvider, ImageResolver};

/// Serves images stored under `{url_prefix}/{key}` from remote storage.
pub struct StorageImageProvider {
    storage: Arc<dyn RemoteStorage>,
    path_prefix: String,
}

impl StorageImageProvider {
    /// Build the provider and its S3 storage from options.
    ///
    /// Fails when the URL prefix is not application-relative (`~/...`) or the
    /// storage configuration is invalid.
    pub fn new(options: ImageProviderOptions) -> ImageResult<Self> {
        let path_prefix = parse_url_prefix(&options.url_prefix)?;
        let storage = S3RemoteStorage::new(options.storage)?;
        Ok(Self {
            storage: Arc::new(storage),
            path_prefix,
        })
    }

    /// Build the provider over an existing storage.
    pub fn with_storage(url_prefix: &str, storage: Arc<dyn RemoteStorage>) -> ImageResult<Self> {
        Ok(Self {
            storage,
            path_prefix: parse_url_prefix(url_prefix)?,
        })
    }

    /// Path prefix with the marker stripped, e.g. `/images`.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// Path relative to the prefix, when the path lies under it. Matching is
    /// ASCII case-insensitive and only on segment boundaries.
    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let prefix_len = self.path_prefix.len();
        let head = path.get(..prefix_len)?;
        if !head.eq_ignore_ascii_case(&self.path_prefix) {
            return None;
        }
        let rest = &path[prefix_len..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Object key for a request path. `None` when the path is outside the
    /// prefix or names nothing below it.
    pub fn object_key(&self, path: &str) -> Option<String> {
        let key = self.strip_prefix(path)?.trim_start_matches('/');
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// Resolve a decoded request path.
    pub async fn resolve(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> ImageResult<Option<StorageImageResolver>> {
        let Some(key) = self.object_key(path) else {
            return Ok(None);
        };

        match self.storage.get_metadata(&key, cancel).await? {
            Some(metadata) => Ok(Some(StorageImageResolver::new(
                self.storage.clone(),
                key,
                metadata,
            ))),
            None => {
                tracing::debug!(key = %key, "Image not found in remote storage");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ImageProvider for StorageImageProvider {
    fn is_match(&self, uri: &Uri) -> bool {
        self.strip_prefix(&request_path(uri)).is_some()
    }

    async fn get(
        &self,
        uri: &Uri,
        cancel: &CancellationToken,
    ) -> ImageResult<Option<Box<dyn ImageResolver>>> {
        let path = request_path(uri);
        let resolver = self.resolve(&path, cancel).await?;
        Ok(resolver.map(|r| Box::new(r) as Box<dyn ImageResolver>))
    }
}

/// Turn `~/images/` into `/images`.
fn parse_url_prefix(url_prefix: &str) -> ImageResult<String> {
    let path = url_prefix.strip_prefix(URL_PREFIX_MARKER).ok_or_else(|| {
        ImageError::InvalidUrlPrefix(format!(
            "{:?} is not an application-relative path ({}/...)",
            url_prefix, URL_PREFIX_MARKER
        ))
    })?;

    if !path.is_empty() && !path.starts_with('/') {
        return Err(ImageError::InvalidUrlPrefix(format!(
            "{:?} must continue with '/' after '{}'",
            url_prefix, URL_PREFIX_MARKER
        )));
    }

    Ok(path.trim_end_matches('/').to_string())
}

/// Percent-decoded request path. Paths that do not decode to UTF-8 are used as sent.
fn request_path(uri: &Uri) -> Cow<'_, str> {
    let path = uri.path();
    percent_decode_str(path)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_prefix() {
        assert_eq!(parse_url_prefix("~/images").unwrap(), "/images");
        assert_eq!(parse_url_prefix("~/images/").unwrap(), "/images");
        assert_eq!(parse_url_prefix("~/media/photos").unwrap(), "/media/photos");
        assert_eq!(parse_url_prefix("~/").unwrap(), "");
        assert_eq!(parse_url_prefix("~").unwrap(), "");
    }

    #[test]
    fn test_parse_url_prefix_rejects_non_relative() {
        assert!(matches!(
            parse_url_prefix("/images"),
            Err(ImageError::InvalidUrlPrefix(_))
        ));
        assert!(matches!(
            parse_url_prefix(""),
            Err(ImageError::InvalidUrlPrefix(_))
        ));
        assert!(matches!(
            parse_url_prefix("~images"),
            Err(ImageError::InvalidUrlPrefix(_))
        ));
    }

    #[test]
    fn test_request_path_is_decoded() {
        let uri: Uri = "/images/summer%20trip/beach.jpg?width=200".parse().unwrap();
        assert_eq!(request_path(&uri), "/images/summer trip/beach.jpg");

        let uri: Uri = "/images/plain.jpg".parse().unwrap();
        assert!(matches!(request_path(&uri), Cow::Borrowed(_)));
    }
}

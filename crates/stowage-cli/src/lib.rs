//! Command bodies for the `stowage` binary.
//!
//! Each command takes the storage as a trait object so it can run against the
//! in-memory provider in tests.

use anyhow::Context;
use std::path::Path;
use std::time::Duration;
use stowage_core::{FileStorageMetadata, FileStorageMetadataInfo};
use stowage_storage::{RemoteStorage, UploadSource};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Optional headers for `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
}

/// Content type from a file extension. Unknown extensions map to
/// `application/octet-stream`.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Upload a local file under `key`.
pub async fn put(
    storage: &dyn RemoteStorage,
    file: &Path,
    key: &str,
    options: PutOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let source = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("Failed to open {}", file.display()))?;

    let content_type = options
        .content_type
        .unwrap_or_else(|| content_type_for(file).to_string());
    let mut metadata = FileStorageMetadataInfo::new(key, content_type);
    if let Some(value) = options.cache_control {
        metadata = metadata.with_cache_control(value);
    }
    if let Some(value) = options.content_disposition {
        metadata = metadata.with_content_disposition(value);
    }
    if let Some(value) = options.content_encoding {
        metadata = metadata.with_content_encoding(value);
    }

    storage
        .save(UploadSource::from_reader(source), &metadata, cancel)
        .await
        .with_context(|| format!("Failed to upload {}", key))?;
    Ok(())
}

/// Download `key` into `output`, or to stdout when no path is given.
/// Returns the number of bytes written.
pub async fn get(
    storage: &dyn RemoteStorage,
    key: &str,
    output: Option<&Path>,
    cancel: &CancellationToken,
) -> anyhow::Result<u64> {
    let response = storage
        .get_content(key, cancel)
        .await
        .with_context(|| format!("Failed to fetch {}", key))?;
    let (_, mut stream) = response.into_parts();

    let written = match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let n = tokio::io::copy(&mut stream, &mut file).await?;
            file.flush().await?;
            n
        }
        None => {
            let mut stdout = tokio::io::stdout();
            let n = tokio::io::copy(&mut stream, &mut stdout).await?;
            stdout.flush().await?;
            n
        }
    };

    stream.close();
    Ok(written)
}

pub async fn remove(
    storage: &dyn RemoteStorage,
    key: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    storage
        .delete(key, cancel)
        .await
        .with_context(|| format!("Failed to delete {}", key))
}

pub async fn exists(
    storage: &dyn RemoteStorage,
    key: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<bool> {
    storage
        .exists(key, cancel)
        .await
        .with_context(|| format!("Failed to check {}", key))
}

/// Exit status for `exists`: `1` when the object is absent, so shell scripts
/// can branch on it.
pub fn exists_status(found: bool) -> u8 {
    if found {
        0
    } else {
        1
    }
}

/// Metadata of `key`; errors when the object is absent.
pub async fn stat(
    storage: &dyn RemoteStorage,
    key: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<FileStorageMetadata> {
    storage
        .get_metadata(key, cancel)
        .await
        .with_context(|| format!("Failed to fetch metadata for {}", key))?
        .with_context(|| format!("{} not found", key))
}

pub async fn presign(
    storage: &dyn RemoteStorage,
    key: &str,
    expires_in: Duration,
) -> anyhow::Result<String> {
    storage
        .get_presigned_url(key, expires_in)
        .await
        .with_context(|| format!("Failed to presign {}", key))
}

/// Initialize tracing for the CLI. Logs go to stderr so `get` can stream to stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use stowage_storage::factory::create_test_storage;
    use stowage_storage::testing::StoredObject;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("a/cat.PNG")), "image/png");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(
            content_type_for(Path::new("archive")),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for(Path::new("data.bin")),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn put_uploads_file_with_headers() {
        let (storage, store) = create_test_storage("media").unwrap();
        let cancel = CancellationToken::new();

        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"not really a png").unwrap();

        let options = PutOptions {
            cache_control: Some("max-age=60".to_string()),
            ..Default::default()
        };
        put(storage.as_ref(), file.path(), "img\\cat.png", options, &cancel)
            .await
            .unwrap();

        let object = store.object("media", "img/cat.png").unwrap();
        assert_eq!(&object.data[..], b"not really a png");
        assert_eq!(object.content_type, "image/png");
        assert_eq!(object.cache_control.as_deref(), Some("max-age=60"));
        assert_eq!(object.content_disposition, None);
    }

    #[tokio::test]
    async fn put_prefers_explicit_content_type() {
        let (storage, store) = create_test_storage("media").unwrap();
        let cancel = CancellationToken::new();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{}").unwrap();

        let options = PutOptions {
            content_type: Some("application/json".to_string()),
            ..Default::default()
        };
        put(storage.as_ref(), file.path(), "data", options, &cancel)
            .await
            .unwrap();

        assert_eq!(
            store.object("media", "data").unwrap().content_type,
            "application/json"
        );
    }

    #[tokio::test]
    async fn put_missing_file_fails_before_upload() {
        let (storage, store) = create_test_storage("media").unwrap();
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();

        let result = put(
            storage.as_ref(),
            &dir.path().join("missing.txt"),
            "missing.txt",
            PutOptions::default(),
            &cancel,
        )
        .await;

        assert!(result.is_err());
        assert!(store.requests().is_empty());
    }

    #[tokio::test]
    async fn get_writes_to_file() {
        let (storage, store) = create_test_storage("media").unwrap();
        let cancel = CancellationToken::new();
        store.insert("media", "notes.txt", StoredObject::new("hello", "text/plain"));

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("notes.txt");
        let written = get(storage.as_ref(), "notes.txt", Some(&output), &cancel)
            .await
            .unwrap();

        assert_eq!(written, 5);
        assert_eq!(std::fs::read(&output).unwrap(), b"hello");
        assert_eq!(store.open_clients(), 0);
    }

    #[tokio::test]
    async fn get_missing_object_fails() {
        let (storage, _store) = create_test_storage("media").unwrap();
        let cancel = CancellationToken::new();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");

        let result = get(storage.as_ref(), "nope", Some(&output), &cancel).await;
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn rm_exists_and_stat() {
        let (storage, store) = create_test_storage("media").unwrap();
        let cancel = CancellationToken::new();
        store.insert("media", "a.txt", StoredObject::new("abc", "text/plain"));

        assert!(exists(storage.as_ref(), "a.txt", &cancel).await.unwrap());
        let metadata = stat(storage.as_ref(), "a.txt", &cancel).await.unwrap();
        assert_eq!(metadata.content_length, 3);
        assert_eq!(metadata.content_type, "text/plain");

        remove(storage.as_ref(), "a.txt", &cancel).await.unwrap();
        remove(storage.as_ref(), "a.txt", &cancel).await.unwrap();
        assert!(!exists(storage.as_ref(), "a.txt", &cancel).await.unwrap());
        assert!(stat(storage.as_ref(), "a.txt", &cancel).await.is_err());
    }

    #[test]
    fn exists_status_reflects_presence() {
        assert_eq!(exists_status(true), 0);
        assert_eq!(exists_status(false), 1);
    }

    #[tokio::test]
    async fn presign_returns_url() {
        let (storage, _store) = create_test_storage("media").unwrap();
        let url = presign(storage.as_ref(), "a.txt", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "memory://media/a.txt?expires_in=60");
    }
}

//! Read-only content stream with an ordered teardown list.

use bytes::Bytes;
use futures::Stream;
use std::any::Any;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};
use tokio_util::io::ReaderStream;

use crate::client::ObjectBody;

/// Forward-only, read-only view over an object body.
///
/// Reads stop after the provider-reported content length. When the stream is
/// closed or dropped, the body is released first and then every held resource
/// in the order it was attached (typically the provider client).
pub struct FileStream {
    reader: Option<Take<ObjectBody>>,
    content_length: Option<u64>,
    held: Vec<Box<dyn Any + Send>>,
}

impl FileStream {
    pub fn new(body: ObjectBody, content_length: Option<u64>) -> Self {
        let limit = content_length.unwrap_or(u64::MAX);
        Self {
            reader: Some(body.take(limit)),
            content_length,
            held: Vec::new(),
        }
    }

    /// Keep `resource` alive until the stream is released.
    pub fn hold<R>(mut self, resource: R) -> Self
    where
        R: Send + 'static,
    {
        self.held.push(Box::new(resource));
        self
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Release the body and everything the stream holds.
    pub fn close(mut self) {
        self.release();
    }

    /// Chunked byte stream, suitable for an HTTP response body.
    pub fn into_byte_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send {
        ReaderStream::new(self)
    }

    fn release(&mut self) {
        self.reader.take();
        for resource in self.held.drain(..) {
            drop(resource);
        }
    }
}

impl AsyncRead for FileStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().reader.as_mut() {
            Some(reader) => Pin::new(reader).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStream")
            .field("content_length", &self.content_length)
            .field("open", &self.reader.is_some())
            .field("held", &self.held.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    struct Probe {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.log.lock().unwrap().push(self.name);
        }
    }

    fn body(data: &'static [u8]) -> ObjectBody {
        Box::pin(Cursor::new(data))
    }

    #[tokio::test]
    async fn test_reads_whole_body() {
        let mut stream = FileStream::new(body(b"hello"), Some(5));
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(stream.content_length(), Some(5));
    }

    #[tokio::test]
    async fn test_reads_are_bounded_by_content_length() {
        let mut stream = FileStream::new(body(b"hello world"), Some(5));
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_unknown_length_reads_to_eof() {
        let mut stream = FileStream::new(body(b"hello world"), None);
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn test_drop_releases_held_resources_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stream = FileStream::new(body(b"x"), Some(1))
            .hold(Probe {
                name: "response",
                log: log.clone(),
            })
            .hold(Probe {
                name: "client",
                log: log.clone(),
            });

        assert!(log.lock().unwrap().is_empty());
        drop(stream);
        assert_eq!(*log.lock().unwrap(), vec!["response", "client"]);
    }

    #[test]
    fn test_close_releases_held_resources() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stream = FileStream::new(body(b"x"), Some(1)).hold(Probe {
            name: "client",
            log: log.clone(),
        });

        stream.close();
        assert_eq!(*log.lock().unwrap(), vec!["client"]);
    }

    #[tokio::test]
    async fn test_into_byte_stream_yields_content() {
        let stream = FileStream::new(body(b"chunked"), Some(7));
        let mut chunks = Box::pin(stream.into_byte_stream());
        let mut out = Vec::new();
        while let Some(chunk) = chunks.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"chunked");
    }
}

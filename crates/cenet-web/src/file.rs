//! `file://` requests backed by tokio's filesystem API.

use crate::error::{WebError, WebResult};
use cenet_core::AbortSignal;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use url::Url;

/// Upper bound on the up-front buffer for `into_bytes`; larger bodies grow
/// as they are read.
const MAX_PREALLOC: u64 = 1 << 20;

pub const METHOD_GET: &str = "GET";
pub const METHOD_PUT: &str = "PUT";

#[derive(Debug, Clone)]
pub struct FileWebRequest {
    uri: Url,
    path: PathBuf,
    method: String,
    abort: AbortSignal,
}

impl FileWebRequest {
    pub fn create(uri: &str) -> WebResult<Self> {
        let url = Url::parse(uri).map_err(|e| WebError::invalid_uri(uri, e))?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> WebResult<Self> {
        if url.scheme() != "file" {
            return Err(WebError::NotSupported(format!(
                "Scheme '{}' is not a file URI",
                url.scheme()
            )));
        }
        let path = url
            .to_file_path()
            .map_err(|_| WebError::invalid_uri(url.as_str(), "not a local file path"))?;
        Ok(Self {
            uri: url,
            path,
            method: METHOD_GET.into(),
            abort: AbortSignal::new(),
        })
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = method.into().trim().to_ascii_uppercase();
    }

    pub fn abort_handle(&self) -> AbortSignal {
        self.abort.clone()
    }

    fn check_aborted(&self) -> WebResult<()> {
        if self.abort.is_aborted() {
            return Err(WebError::Canceled);
        }
        Ok(())
    }

    /// Open the file for reading. Only `GET` has a response body.
    pub async fn get_response(self) -> WebResult<FileWebResponse> {
        self.check_aborted()?;
        if self.method != METHOD_GET {
            return Err(WebError::NotSupported(format!(
                "Method {} is not supported for file URIs",
                self.method
            )));
        }
        let file = File::open(&self.path).await?;
        let content_length = file.metadata().await?.len();
        log::debug!("opened {} ({} bytes)", self.path.display(), content_length);
        Ok(FileWebResponse {
            uri: self.uri,
            content_length,
            stream: Some(BufReader::new(file)),
        })
    }

    /// Create or truncate the file for writing. Only `PUT` takes a body.
    pub async fn get_request_stream(self) -> WebResult<FileRequestStream> {
        self.check_aborted()?;
        if self.method != METHOD_PUT {
            return Err(WebError::NotSupported(format!(
                "Method {} does not take a request body",
                self.method
            )));
        }
        let file = File::create(&self.path).await?;
        Ok(FileRequestStream {
            uri: self.uri,
            file,
            written: 0,
        })
    }
}

#[derive(Debug)]
pub struct FileWebResponse {
    uri: Url,
    content_length: u64,
    stream: Option<BufReader<File>>,
}

impl FileWebResponse {
    pub fn response_uri(&self) -> &Url {
        &self.uri
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn get_response_stream(&mut self) -> WebResult<&mut BufReader<File>> {
        self.stream
            .as_mut()
            .ok_or_else(|| WebError::NotSupported("response stream is closed".into()))
    }

    pub fn close(&mut self) {
        self.stream = None;
    }

    pub async fn into_bytes(mut self) -> WebResult<Vec<u8>> {
        let mut body = Vec::with_capacity(initial_capacity(self.content_length));
        if let Some(stream) = self.stream.as_mut() {
            stream.read_to_end(&mut body).await?;
        }
        self.close();
        Ok(body)
    }
}

/// Upload body for `PUT file://…`.
#[derive(Debug)]
pub struct FileRequestStream {
    uri: Url,
    file: File,
    written: u64,
}

impl FileRequestStream {
    pub fn response_uri(&self) -> &Url {
        &self.uri
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush to disk and describe what was written.
    pub async fn finish(mut self) -> WebResult<FileWebResponse> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(FileWebResponse {
            uri: self.uri,
            content_length: self.written,
            stream: None,
        })
    }
}

impl AsyncWrite for FileRequestStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.file).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            self.written += n as u64;
        }
        poll
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_shutdown(cx)
    }
}

fn initial_capacity(content_length: u64) -> usize {
    usize::try_from(content_length.min(MAX_PREALLOC)).unwrap_or(0)
}

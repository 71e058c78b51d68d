//! `WebClient`: whole-body downloads and uploads over any supported scheme.
//!
//! A client runs one operation at a time. A call that starts while another
//! is in flight fails with `ConcurrentIo` instead of queueing.

use crate::error::{WebError, WebResult};
use crate::request::{WebRequest, WebResponse};
use cenet_core::{AbortSignal, IoGuard, NetworkCredential};
use cenet_ftp::FtpRequestOptions;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::fs::File;
use tokio::task::JoinHandle;
use url::Url;

/// Client-wide settings, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebClientConfig {
    /// Relative addresses resolve against this.
    #[serde(default)]
    pub base_address: Option<String>,
    /// Used when the address carries no user info.
    #[serde(default)]
    pub credentials: Option<NetworkCredential>,
    #[serde(default)]
    pub ftp: FtpRequestOptions,
}

#[derive(Debug, Default)]
pub struct WebClient {
    config: WebClientConfig,
    guard: IoGuard,
    current: Mutex<Option<AbortSignal>>,
}

impl WebClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WebClientConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &WebClientConfig {
        &self.config
    }

    pub fn base_address(&self) -> Option<&str> {
        self.config.base_address.as_deref()
    }

    pub fn set_base_address(&mut self, base: Option<String>) {
        self.config.base_address = base;
    }

    pub fn set_credentials(&mut self, credentials: Option<NetworkCredential>) {
        self.config.credentials = credentials;
    }

    /// True while an operation is in flight.
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Abort the in-flight operation, if any. Best effort: the operation
    /// fails with `Canceled` at its next await point.
    pub fn cancel(&self) {
        if let Ok(current) = self.current.lock() {
            if let Some(signal) = current.as_ref() {
                log::debug!("canceling in-flight request");
                signal.abort();
            }
        }
    }

    fn resolve(&self, address: &str) -> WebResult<Url> {
        match Url::parse(address) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.config.base_address.as_deref().ok_or_else(|| {
                    WebError::invalid_uri(address, "relative address and no base address set")
                })?;
                let base = Url::parse(base).map_err(|e| WebError::invalid_uri(base, e))?;
                base.join(address).map_err(|e| WebError::invalid_uri(address, e))
            }
            Err(e) => Err(WebError::invalid_uri(address, e)),
        }
    }

    fn prepare(&self, address: &str, method: Option<&str>, upload: bool) -> WebResult<WebRequest> {
        let url = self.resolve(address)?;
        let has_user_info = !url.username().is_empty();
        let mut request = WebRequest::from_url(url)?;
        request.apply_ftp_options(&self.config.ftp);
        if !has_user_info {
            if let Some(credentials) = &self.config.credentials {
                request.set_credentials(credentials.clone());
            }
        }
        let method = match method {
            Some(m) => m,
            None if upload => request.default_upload_method(),
            None => request.default_download_method(),
        };
        request.set_method(method);
        Ok(request)
    }

    /// Run one operation under the overlap guard with cancellation wired up.
    async fn exclusive<T, F, Fut>(&self, request: WebRequest, op: F) -> WebResult<T>
    where
        F: FnOnce(WebRequest) -> Fut,
        Fut: Future<Output = WebResult<T>>,
    {
        let _token = self.guard.enter()?;
        let signal = request.abort_handle();
        if let Ok(mut current) = self.current.lock() {
            *current = Some(signal.clone());
        }
        let result = signal
            .run(op(request))
            .await
            .unwrap_or(Err(WebError::Canceled));
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
        result
    }

    pub async fn download_data(&self, address: &str) -> WebResult<Vec<u8>> {
        let request = self.prepare(address, None, false)?;
        self.exclusive(request, |request| async move {
            request.get_response().await?.into_bytes().await
        })
        .await
    }

    pub async fn download_string(&self, address: &str) -> WebResult<String> {
        let bytes = self.download_data(address).await?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Stream the resource into a local file. Returns the bytes written.
    pub async fn download_file(&self, address: &str, path: impl AsRef<Path>) -> WebResult<u64> {
        let request = self.prepare(address, None, false)?;
        let path = path.as_ref().to_path_buf();
        self.exclusive(request, |request| async move {
            let response = request.get_response().await?;
            let mut file = File::create(&path).await?;
            let copied = response.copy_to(&mut file).await?;
            file.sync_all().await?;
            Ok(copied)
        })
        .await
    }

    /// Upload `data`. `method` overrides the scheme's default upload verb,
    /// e.g. `STOU` or `APPE` for FTP.
    pub async fn upload_data(
        &self,
        address: &str,
        method: Option<&str>,
        data: &[u8],
    ) -> WebResult<WebResponse> {
        let request = self.prepare(address, method, true)?;
        self.exclusive(request, |request| async move {
            let mut stream = request.get_request_stream().await?;
            let mut body = data;
            stream.send_from(&mut body).await?;
            stream.finish().await
        })
        .await
    }

    pub async fn upload_string(
        &self,
        address: &str,
        method: Option<&str>,
        data: &str,
    ) -> WebResult<WebResponse> {
        self.upload_data(address, method, data.as_bytes()).await
    }

    pub async fn upload_file(
        &self,
        address: &str,
        method: Option<&str>,
        path: impl AsRef<Path>,
    ) -> WebResult<WebResponse> {
        let request = self.prepare(address, method, true)?;
        let path = path.as_ref().to_path_buf();
        self.exclusive(request, |request| async move {
            let mut source = File::open(&path).await?;
            let mut stream = request.get_request_stream().await?;
            stream.send_from(&mut source).await?;
            stream.finish().await
        })
        .await
    }

    /// `download_data` on the tokio runtime.
    pub fn spawn_download_data(self: &Arc<Self>, address: impl Into<String>) -> JoinHandle<WebResult<Vec<u8>>> {
        let client = Arc::clone(self);
        let address = address.into();
        tokio::spawn(async move { client.download_data(&address).await })
    }

    /// `upload_data` on the tokio runtime.
    pub fn spawn_upload_data(
        self: &Arc<Self>,
        address: impl Into<String>,
        method: Option<String>,
        data: Vec<u8>,
    ) -> JoinHandle<WebResult<WebResponse>> {
        let client = Arc::clone(self);
        let address = address.into();
        tokio::spawn(async move {
            client
                .upload_data(&address, method.as_deref(), &data)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_address_needs_base() {
        let client = WebClient::new();
        assert!(matches!(
            client.resolve("a.txt").unwrap_err(),
            WebError::InvalidUri { .. }
        ));

        let mut client = WebClient::new();
        client.set_base_address(Some("ftp://host/pub/".into()));
        assert_eq!(client.resolve("a.txt").unwrap().as_str(), "ftp://host/pub/a.txt");
        assert_eq!(
            client.resolve("ftp://other/b").unwrap().as_str(),
            "ftp://other/b"
        );
    }

    #[test]
    fn test_prepare_applies_config() {
        let config: WebClientConfig = serde_json::from_str(
            r#"{"credentials":{"userName":"alice","password":"pw"},"ftp":{"contentOffset":5}}"#,
        )
        .unwrap();
        let client = WebClient::with_config(config);

        match client.prepare("ftp://host/x.bin", Some("APPE"), true).unwrap() {
            WebRequest::Ftp(r) => {
                assert_eq!(r.options().credentials.user_name, "alice");
                assert_eq!(r.options().content_offset, 5);
                assert_eq!(r.method().verb(), "APPE");
            }
            WebRequest::File(_) => unreachable!(),
        }

        match client.prepare("ftp://bob@host/x.bin", None, true).unwrap() {
            WebRequest::Ftp(r) => {
                assert_eq!(r.options().credentials.user_name, "bob");
                assert_eq!(r.method().verb(), "STOR");
            }
            WebRequest::File(_) => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_file_round_trip_through_client() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Url::from_file_path(dir.path().join("note.txt")).unwrap().to_string();
        let client = WebClient::new();

        let response = client.upload_string(&uri, None, "hello").await.unwrap();
        assert_eq!(response.content_length(), Some(5));
        assert_eq!(client.download_string(&uri).await.unwrap(), "hello");
        assert!(!client.is_busy());

        let copy = dir.path().join("copy.txt");
        assert_eq!(client.download_file(&uri, &copy).await.unwrap(), 5);
        assert_eq!(std::fs::read_to_string(copy).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_unsupported_scheme_fails_before_io() {
        let client = WebClient::new();
        let err = client.download_data("gopher://host/x").await.unwrap_err();
        assert!(matches!(err, WebError::NotSupported(_)));
        assert!(!client.is_busy());
    }
}

//! Scheme dispatch: one `WebRequest` type over the FTP and file transports.

use crate::error::{WebError, WebResult};
use crate::file::{FileRequestStream, FileWebRequest, FileWebResponse, METHOD_GET, METHOD_PUT};
use cenet_core::{AbortSignal, NetworkCredential};
use cenet_ftp::{
    FtpError, FtpMethod, FtpRequestOptions, FtpRequestStream, FtpWebRequest, FtpWebResponse,
};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite};
use url::Url;

#[derive(Debug, Clone)]
pub enum WebRequest {
    Ftp(FtpWebRequest),
    File(FileWebRequest),
}

impl WebRequest {
    /// Pick the implementation for the URI scheme. Unknown schemes fail
    /// here, before any I/O.
    pub fn create(uri: &str) -> WebResult<Self> {
        let url = Url::parse(uri).map_err(|e| WebError::invalid_uri(uri, e))?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> WebResult<Self> {
        match url.scheme() {
            "ftp" => Ok(Self::Ftp(FtpWebRequest::from_url(url)?)),
            "file" => Ok(Self::File(FileWebRequest::from_url(url)?)),
            other => Err(WebError::NotSupported(format!(
                "The URI scheme '{}' is not supported",
                other
            ))),
        }
    }

    pub fn uri(&self) -> &Url {
        match self {
            Self::Ftp(r) => r.uri(),
            Self::File(r) => r.uri(),
        }
    }

    pub fn method(&self) -> String {
        match self {
            Self::Ftp(r) => r.method().verb().to_string(),
            Self::File(r) => r.method().to_string(),
        }
    }

    /// FTP takes verbs (`RETR`, `STOU`, …); file URIs take `GET` and `PUT`.
    pub fn set_method(&mut self, method: &str) {
        match self {
            Self::Ftp(r) => r.set_method(FtpMethod::from_verb(method)),
            Self::File(r) => r.set_method(method),
        }
    }

    /// Method used for uploads when the caller names none.
    pub fn default_upload_method(&self) -> &'static str {
        match self {
            Self::Ftp(_) => "STOR",
            Self::File(_) => METHOD_PUT,
        }
    }

    pub fn default_download_method(&self) -> &'static str {
        match self {
            Self::Ftp(_) => "RETR",
            Self::File(_) => METHOD_GET,
        }
    }

    /// File URIs carry no credentials; the call is ignored for them.
    pub fn set_credentials(&mut self, credentials: NetworkCredential) {
        if let Self::Ftp(r) = self {
            r.set_credentials(credentials);
        }
    }

    /// Replace the FTP options, keeping credentials already on the request.
    pub fn apply_ftp_options(&mut self, options: &FtpRequestOptions) {
        if let Self::Ftp(r) = self {
            let credentials = r.options().credentials.clone();
            *r.options_mut() = FtpRequestOptions {
                credentials,
                ..options.clone()
            };
        }
    }

    pub fn abort_handle(&self) -> AbortSignal {
        match self {
            Self::Ftp(r) => r.abort_handle(),
            Self::File(r) => r.abort_handle(),
        }
    }

    pub async fn get_response(self) -> WebResult<WebResponse> {
        match self {
            Self::Ftp(r) => Ok(WebResponse::Ftp(r.get_response().await?)),
            Self::File(r) => Ok(WebResponse::File(r.get_response().await?)),
        }
    }

    pub async fn get_request_stream(self) -> WebResult<RequestStream> {
        match self {
            Self::Ftp(r) => Ok(RequestStream::Ftp(r.get_request_stream().await?)),
            Self::File(r) => Ok(RequestStream::File(r.get_request_stream().await?)),
        }
    }
}

#[derive(Debug)]
pub enum WebResponse {
    Ftp(FtpWebResponse),
    File(FileWebResponse),
}

impl WebResponse {
    pub fn response_uri(&self) -> &Url {
        match self {
            Self::Ftp(r) => r.response_uri(),
            Self::File(r) => r.response_uri(),
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        match self {
            Self::Ftp(r) => r.content_length(),
            Self::File(r) => Some(r.content_length()),
        }
    }

    /// Status line for FTP responses.
    pub fn status_description(&self) -> Option<&str> {
        match self {
            Self::Ftp(r) => Some(r.status_description()),
            Self::File(_) => None,
        }
    }

    pub async fn into_bytes(self) -> WebResult<Vec<u8>> {
        match self {
            Self::Ftp(r) => Ok(r.into_bytes().await?),
            Self::File(r) => r.into_bytes().await,
        }
    }

    /// Stream the body into `sink` and close the response.
    pub async fn copy_to<W>(self, sink: &mut W) -> WebResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            Self::Ftp(mut r) => {
                let copied = match r.take_stream() {
                    Some(mut stream) => {
                        let copied = tokio::io::copy(&mut stream, sink).await;
                        let closed = stream.close().await;
                        let copied = copied.map_err(FtpError::from)?;
                        closed?;
                        copied
                    }
                    None => 0,
                };
                Ok(copied)
            }
            Self::File(mut r) => {
                let copied = tokio::io::copy(r.get_response_stream()?, sink).await?;
                r.close();
                Ok(copied)
            }
        }
    }

    pub async fn close(&mut self) -> WebResult<()> {
        match self {
            Self::Ftp(r) => Ok(r.close().await?),
            Self::File(r) => {
                r.close();
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
pub enum RequestStream {
    Ftp(FtpRequestStream),
    File(FileRequestStream),
}

impl RequestStream {
    pub fn response_uri(&self) -> &Url {
        match self {
            Self::Ftp(s) => s.response_uri(),
            Self::File(s) => s.response_uri(),
        }
    }

    /// Copy all of `source` into the stream.
    pub async fn send_from<R>(&mut self, source: &mut R) -> WebResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        Ok(tokio::io::copy(source, self).await?)
    }

    /// Complete the upload and return what the server reported.
    pub async fn finish(self) -> WebResult<WebResponse> {
        match self {
            Self::Ftp(s) => Ok(WebResponse::Ftp(s.finish().await?)),
            Self::File(s) => Ok(WebResponse::File(s.finish().await?)),
        }
    }
}

impl AsyncWrite for RequestStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Ftp(s) => Pin::new(s).poll_write(cx, buf),
            Self::File(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Ftp(s) => Pin::new(s).poll_flush(cx),
            Self::File(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Ftp(s) => Pin::new(s).poll_shutdown(cx),
            Self::File(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_dispatch() {
        assert!(matches!(WebRequest::create("ftp://host/a.txt").unwrap(), WebRequest::Ftp(_)));
        let file = if cfg!(windows) { "file:///C:/tmp/a.txt" } else { "file:///tmp/a.txt" };
        assert!(matches!(WebRequest::create(file).unwrap(), WebRequest::File(_)));
    }

    #[test]
    fn test_unknown_scheme_is_not_supported() {
        let err = WebRequest::create("gopher://host/").unwrap_err();
        assert!(matches!(err, WebError::NotSupported(_)));
        assert_eq!(err.status(), cenet_core::WebExceptionStatus::NotSupported);
    }

    #[test]
    fn test_method_strings() {
        let mut req = WebRequest::create("ftp://host/dir/").unwrap();
        assert_eq!(req.method(), "RETR");
        req.set_method("stou");
        assert_eq!(req.method(), "STOU");
        assert_eq!(req.default_upload_method(), "STOR");
    }

    #[test]
    fn test_apply_options_keeps_uri_credentials() {
        let mut req = WebRequest::create("ftp://bob:pw@host/a").unwrap();
        let opts = FtpRequestOptions {
            content_offset: 7,
            ..Default::default()
        };
        req.apply_ftp_options(&opts);
        match req {
            WebRequest::Ftp(r) => {
                assert_eq!(r.options().credentials.user_name, "bob");
                assert_eq!(r.options().content_offset, 7);
            }
            WebRequest::File(_) => unreachable!(),
        }
    }
}

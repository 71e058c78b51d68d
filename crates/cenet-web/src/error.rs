use cenet_core::{ConcurrentIo, WebExceptionStatus};
use cenet_ftp::FtpError;
use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    #[error(transparent)]
    Ftp(#[from] FtpError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    NotSupported(String),
    #[error(transparent)]
    ConcurrentIo(#[from] ConcurrentIo),
    #[error("invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("request was canceled")]
    Canceled,
    #[error("response is not valid UTF-8")]
    Decode(#[from] FromUtf8Error),
}

pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn invalid_uri(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// The coarse bucket a caller can branch on.
    pub fn status(&self) -> WebExceptionStatus {
        match self {
            Self::Ftp(e) => e.status(),
            Self::Io(e) => WebExceptionStatus::from_io_error(e),
            Self::NotSupported(_) => WebExceptionStatus::NotSupported,
            Self::Canceled => WebExceptionStatus::RequestCanceled,
            Self::ConcurrentIo(_) | Self::InvalidUri { .. } | Self::Decode(_) => {
                WebExceptionStatus::UnknownError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_buckets() {
        assert_eq!(
            WebError::NotSupported("gopher".into()).status(),
            WebExceptionStatus::NotSupported
        );
        assert_eq!(WebError::Canceled.status(), WebExceptionStatus::RequestCanceled);
        let io = WebError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert_eq!(io.status(), WebExceptionStatus::ConnectionClosed);
        let ftp = WebError::from(FtpError::from_reply(550, "550 nope"));
        assert_eq!(ftp.status(), WebExceptionStatus::ProtocolError);
    }

    #[test]
    fn test_concurrent_io_message() {
        let err = WebError::from(ConcurrentIo);
        assert!(err.to_string().contains("concurrent"));
    }
}

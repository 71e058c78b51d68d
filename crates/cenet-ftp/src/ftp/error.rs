//! FTP-specific error type.

use crate::ftp::status::FtpStatusCode;
use cenet_core::{ConcurrentIo, WebExceptionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised FTP error.
///
/// Carries the coarse `WebExceptionStatus` bucket together with the last
/// server reply text seen on the control channel, when there was one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpError {
    pub kind: FtpErrorKind,
    pub message: String,
    /// FTP reply code that triggered the error, if any.
    pub code: Option<u16>,
    pub status: WebExceptionStatus,
    /// Last multi-line reply received before the failure.
    pub server_text: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FtpErrorKind {
    /// TCP connect failure.
    ConnectionFailed,
    /// Host name did not resolve.
    NameResolution,
    /// AUTH TLS / TLS handshake failure.
    TlsFailed,
    /// Wrong username/password.
    AuthFailed,
    /// Server returned a 4xx/5xx for a command.
    CommandRejected,
    /// Data channel could not be established (PASV/PORT failed).
    DataChannelFailed,
    /// Transfer aborted or incomplete.
    TransferFailed,
    /// Server sent something the client cannot work with.
    ProtocolError,
    /// Local or socket I/O error.
    IoError,
    Timeout,
    /// Control connection dropped.
    Disconnected,
    PermissionDenied,
    NotFound,
    QuotaExceeded,
    /// Scheme, method or stream direction not supported.
    NotSupported,
    /// A second operation was started while one was in flight.
    ConcurrentIo,
    /// The stream was already closed.
    StreamClosed,
    /// Aborted by the caller.
    Canceled,
    /// Config / parameter validation error.
    InvalidConfig,
}

impl FtpErrorKind {
    /// Default bucket for errors that do not come from an OS error.
    fn default_status(self) -> WebExceptionStatus {
        match self {
            Self::ConnectionFailed => WebExceptionStatus::ConnectFailure,
            Self::NameResolution => WebExceptionStatus::NameResolutionFailure,
            Self::TlsFailed => WebExceptionStatus::SecureChannelFailure,
            Self::Timeout => WebExceptionStatus::Timeout,
            Self::Disconnected => WebExceptionStatus::ConnectionClosed,
            Self::Canceled => WebExceptionStatus::RequestCanceled,
            Self::NotSupported => WebExceptionStatus::NotSupported,
            Self::ConcurrentIo | Self::StreamClosed | Self::InvalidConfig => {
                WebExceptionStatus::UnknownError
            }
            _ => WebExceptionStatus::ProtocolError,
        }
    }
}

pub type FtpResult<T> = Result<T, FtpError>;

// ── Construction helpers ─────────────────────────────────────────────

impl FtpError {
    pub fn new(kind: FtpErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            code: None,
            status: kind.default_status(),
            server_text: None,
            session_id: None,
        }
    }

    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_session(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Attach the last server reply, unless one is already recorded.
    pub fn with_server_text(mut self, text: Option<String>) -> Self {
        if self.server_text.is_none() {
            self.server_text = text.filter(|t| !t.is_empty());
        }
        self
    }

    pub fn status(&self) -> WebExceptionStatus {
        self.status
    }

    /// Reply code as the closed enumeration.
    pub fn ftp_status(&self) -> FtpStatusCode {
        self.code
            .map(FtpStatusCode::from_code)
            .unwrap_or(FtpStatusCode::Undefined)
    }

    // ── Convenience constructors ─────────────────────────────────

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::ConnectionFailed, msg)
    }

    pub fn name_resolution(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::NameResolution, msg)
    }

    pub fn tls_failed(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::TlsFailed, msg)
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::AuthFailed, msg)
    }

    pub fn data_channel(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::DataChannelFailed, msg)
    }

    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::ProtocolError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::Timeout, msg)
    }

    pub fn disconnected(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::Disconnected, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::NotSupported, msg)
    }

    pub fn stream_closed() -> Self {
        Self::new(FtpErrorKind::StreamClosed, "stream is closed")
    }

    pub fn canceled() -> Self {
        Self::new(FtpErrorKind::Canceled, "request was aborted")
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(FtpErrorKind::InvalidConfig, msg)
    }

    /// Classify an FTP reply code into the most appropriate error kind.
    /// Negative replies always land in the `ProtocolError` bucket except
    /// 421, which means the server is closing the control connection.
    pub fn from_reply(code: u16, text: &str) -> Self {
        let kind = match code {
            421 => FtpErrorKind::Disconnected,
            425 | 426 => FtpErrorKind::DataChannelFailed,
            430 | 530 => FtpErrorKind::AuthFailed,
            450 | 550 => {
                let lower = text.to_lowercase();
                if lower.contains("permission") || lower.contains("denied") {
                    FtpErrorKind::PermissionDenied
                } else if lower.contains("not found") || lower.contains("no such") {
                    FtpErrorKind::NotFound
                } else if lower.contains("quota") {
                    FtpErrorKind::QuotaExceeded
                } else {
                    FtpErrorKind::CommandRejected
                }
            }
            451 | 452 | 552 => FtpErrorKind::TransferFailed,
            _ => FtpErrorKind::CommandRejected,
        };
        let status = if code == 421 {
            WebExceptionStatus::ConnectionClosed
        } else {
            WebExceptionStatus::ProtocolError
        };
        Self {
            kind,
            message: crate::ftp::reply::last_line_of(text).to_string(),
            code: Some(code),
            status,
            server_text: Some(text.to_string()),
            session_id: None,
        }
    }
}

impl fmt::Display for FtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "[FTP {:?} {}] {}", self.kind, code, self.message)
        } else {
            write!(f, "[FTP {:?}] {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for FtpError {}

impl From<std::io::Error> for FtpError {
    fn from(e: std::io::Error) -> Self {
        if let Some(inner) = e.get_ref().and_then(|r| r.downcast_ref::<FtpError>()) {
            return inner.clone();
        }
        let status = WebExceptionStatus::from_io_error(&e);
        let kind = match status {
            WebExceptionStatus::Timeout => FtpErrorKind::Timeout,
            WebExceptionStatus::ConnectionClosed => FtpErrorKind::Disconnected,
            WebExceptionStatus::ConnectFailure => FtpErrorKind::ConnectionFailed,
            WebExceptionStatus::NotSupported => FtpErrorKind::NotSupported,
            _ => FtpErrorKind::IoError,
        };
        let mut err = Self::new(kind, e.to_string());
        err.status = status;
        err
    }
}

impl From<ConcurrentIo> for FtpError {
    fn from(e: ConcurrentIo) -> Self {
        Self::new(FtpErrorKind::ConcurrentIo, e.to_string())
    }
}

impl From<FtpError> for std::io::Error {
    fn from(e: FtpError) -> Self {
        let kind = match e.kind {
            FtpErrorKind::Timeout => std::io::ErrorKind::TimedOut,
            FtpErrorKind::Disconnected => std::io::ErrorKind::ConnectionAborted,
            FtpErrorKind::NotSupported => std::io::ErrorKind::Unsupported,
            _ => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_from_reply_buckets_as_protocol_error() {
        let err = FtpError::from_reply(550, "550 No such file or directory");
        assert_eq!(err.kind, FtpErrorKind::NotFound);
        assert_eq!(err.status, WebExceptionStatus::ProtocolError);
        assert_eq!(err.ftp_status(), FtpStatusCode::ActionNotTakenFileUnavailable);
        assert_eq!(err.server_text.as_deref(), Some("550 No such file or directory"));
    }

    #[test]
    fn test_421_is_connection_closed() {
        let err = FtpError::from_reply(421, "421 Timeout");
        assert_eq!(err.status, WebExceptionStatus::ConnectionClosed);
    }

    #[test]
    fn test_io_errors_map_to_buckets() {
        let err: FtpError = io::Error::new(io::ErrorKind::TimedOut, "t").into();
        assert_eq!(err.kind, FtpErrorKind::Timeout);
        assert_eq!(err.status, WebExceptionStatus::Timeout);

        let err: FtpError = io::Error::new(io::ErrorKind::ConnectionReset, "r").into();
        assert_eq!(err.status, WebExceptionStatus::ConnectionClosed);

        let err: FtpError = io::Error::new(io::ErrorKind::PermissionDenied, "p").into();
        assert_eq!(err.kind, FtpErrorKind::IoError);
        assert_eq!(err.status, WebExceptionStatus::ProtocolError);
    }

    #[test]
    fn test_server_text_is_write_once() {
        let err = FtpError::timeout("slow")
            .with_server_text(Some("226 first".into()))
            .with_server_text(Some("226 second".into()));
        assert_eq!(err.server_text.as_deref(), Some("226 first"));
    }
}

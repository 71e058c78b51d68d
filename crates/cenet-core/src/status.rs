//! Coarse failure buckets attached to every transport error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// Why a request failed, at the granularity callers usually branch on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum WebExceptionStatus {
    Success,
    /// Host name could not be resolved.
    NameResolutionFailure,
    /// TCP connect was refused or the host is unreachable.
    ConnectFailure,
    /// Peer closed the connection mid-operation.
    ConnectionClosed,
    Timeout,
    /// TLS handshake or certificate failure.
    SecureChannelFailure,
    /// Server answered with a negative or unexpected reply.
    ProtocolError,
    RequestCanceled,
    /// Scheme, method or feature not available.
    NotSupported,
    UnknownError,
}

impl WebExceptionStatus {
    /// Bucket an OS-level I/O error.
    ///
    /// Anything that is not clearly a connect, close or timeout condition
    /// falls into `ProtocolError`.
    pub fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::NotConnected => Self::ConnectFailure,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::ConnectionClosed,
            io::ErrorKind::Unsupported => Self::NotSupported,
            _ => Self::ProtocolError,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl Default for WebExceptionStatus {
    fn default() -> Self {
        Self::UnknownError
    }
}

impl fmt::Display for WebExceptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::NameResolutionFailure => "name resolution failure",
            Self::ConnectFailure => "connect failure",
            Self::ConnectionClosed => "connection closed",
            Self::Timeout => "timeout",
            Self::SecureChannelFailure => "secure channel failure",
            Self::ProtocolError => "protocol error",
            Self::RequestCanceled => "request canceled",
            Self::NotSupported => "not supported",
            Self::UnknownError => "unknown error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_buckets() {
        let cases = [
            (io::ErrorKind::TimedOut, WebExceptionStatus::Timeout),
            (io::ErrorKind::ConnectionRefused, WebExceptionStatus::ConnectFailure),
            (io::ErrorKind::ConnectionReset, WebExceptionStatus::ConnectionClosed),
            (io::ErrorKind::UnexpectedEof, WebExceptionStatus::ConnectionClosed),
            (io::ErrorKind::InvalidData, WebExceptionStatus::ProtocolError),
        ];
        for (kind, expected) in cases {
            let err = io::Error::new(kind, "x");
            assert_eq!(WebExceptionStatus::from_io_error(&err), expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_serde_camel_case() {
        let json = serde_json::to_string(&WebExceptionStatus::NameResolutionFailure).unwrap();
        assert_eq!(json, "\"nameResolutionFailure\"");
    }
}

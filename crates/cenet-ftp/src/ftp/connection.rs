//! TCP + TLS transport for the FTP control connection.
//!
//! Name resolution and TCP connect are separate steps so a failure can be
//! reported as `NameResolutionFailure` or `ConnectFailure` respectively.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::FtpCodec;
use crate::ftp::tls;
use crate::ftp::types::{FtpEndpoint, FtpReply, FtpRequestOptions, FtpSecurityMode};
use cenet_core::WebExceptionStatus;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;

/// A plain or TLS-wrapped socket, used for both control and data channels.
pub enum NetStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl NetStream {
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn tcp(&self) -> &TcpStream {
        match self {
            Self::Plain(tcp) => tcp,
            Self::Tls(tls) => tls.get_ref().0,
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().peer_addr()
    }
}

impl AsyncRead for NetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Resolve `endpoint` to socket addresses.
pub async fn resolve(endpoint: &FtpEndpoint, dur: Duration) -> FtpResult<Vec<SocketAddr>> {
    let target = endpoint.to_string();
    let addrs: Vec<SocketAddr> = timeout(dur, lookup_host(target.as_str()))
        .await
        .map_err(|_| FtpError::timeout(format!("Resolving {} timed out", endpoint.host)))?
        .map_err(|e| FtpError::name_resolution(format!("Resolving {}: {}", endpoint.host, e)))?
        .collect();
    if addrs.is_empty() {
        return Err(FtpError::name_resolution(format!(
            "No addresses found for {}",
            endpoint.host
        )));
    }
    Ok(addrs)
}

/// Connect to the first reachable address.
pub async fn connect_tcp(addrs: &[SocketAddr], dur: Duration) -> FtpResult<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        match timeout(dur, TcpStream::connect(addr)).await {
            Ok(Ok(tcp)) => {
                tcp.set_nodelay(true).ok();
                return Ok(tcp);
            }
            Ok(Err(e)) => {
                log::debug!("TCP connect to {} failed: {}", addr, e);
                let mut err = FtpError::connection_failed(format!("TCP connect to {}: {}", addr, e));
                if WebExceptionStatus::from_io_error(&e) == WebExceptionStatus::Timeout {
                    err.status = WebExceptionStatus::Timeout;
                }
                last_err = Some(err);
            }
            Err(_) => {
                last_err = Some(FtpError::timeout(format!("TCP connect to {} timed out", addr)));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| FtpError::connection_failed("No address to connect to")))
}

/// Establish the control connection and return a ready-to-use codec
/// **plus** the server welcome banner.
///
/// For Explicit FTPS the session issues AUTH TLS afterwards.
pub async fn connect(
    endpoint: &FtpEndpoint,
    options: &FtpRequestOptions,
) -> FtpResult<(FtpCodec<NetStream>, FtpReply)> {
    let addrs = resolve(endpoint, options.connect_timeout()).await?;
    let tcp = connect_tcp(&addrs, options.connect_timeout()).await?;
    log::debug!("Control connection to {} established", endpoint);

    let stream = match options.security {
        // Implicit FTPS: TLS wraps the socket immediately.
        FtpSecurityMode::Implicit => {
            let tls = tls::wrap_stream(tcp, &endpoint.host, options.accept_invalid_certs).await?;
            NetStream::Tls(Box::new(tls))
        }
        // Plain TCP. Explicit mode upgrades later.
        _ => NetStream::Plain(tcp),
    };

    let mut codec = FtpCodec::new(stream);
    let banner = timeout(options.reply_timeout(), codec.read_reply())
        .await
        .map_err(|_| FtpError::timeout("Timed out waiting for server banner"))??;
    Ok((codec, banner))
}

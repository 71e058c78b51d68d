//! Data-channel management for FTP transfers.
//!
//! Supports four modes (RFC 959 + RFC 2428):
//! - **PASV**: server opens a port, client connects
//! - **EPSV**: extended passive (IPv6-ready)
//! - **PORT**: client opens a port, tells server
//! - **EPRT**: extended active (IPv6-ready)
//!
//! Setting up a channel is split in two. `prepare_data_channel` runs
//! before the transfer verb; `establish` runs after it, because in the
//! active modes the server only connects once it has seen the verb.
//! The data socket is TLS-wrapped whenever the control channel is secured.

use crate::ftp::connection::NetStream;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::session::FtpSession;
use crate::ftp::tls;
use crate::ftp::types::{DataChannelMode, FtpSecurityMode};
use lazy_static::lazy_static;
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

lazy_static! {
    static ref PASV_ADDR: Regex =
        Regex::new(r"\((\d+),(\d+),(\d+),(\d+),(\d+),(\d+)\)").unwrap();
    static ref EPSV_PORT: Regex = Regex::new(r"\|\|\|(\d+)\|").unwrap();
}

/// A data channel announced to the server but not yet usable.
pub enum PendingData {
    /// Passive modes: already connected to the server.
    Connected(TcpStream),
    /// Active modes: waiting for the server to connect back.
    Listening(TcpListener),
}

impl FtpSession {
    /// Negotiate the data channel for the next transfer verb.
    pub async fn prepare_data_channel(&mut self) -> FtpResult<PendingData> {
        let pending = match self.options.data_channel_mode {
            DataChannelMode::Passive => PendingData::Connected(self.open_pasv().await?),
            DataChannelMode::ExtendedPassive => PendingData::Connected(self.open_epsv().await?),
            DataChannelMode::Active => PendingData::Listening(self.open_port().await?),
            DataChannelMode::ExtendedActive => PendingData::Listening(self.open_eprt().await?),
        };
        Ok(pending)
    }

    /// Finish the data channel once the transfer verb has been accepted.
    pub async fn establish(&mut self, pending: PendingData) -> FtpResult<NetStream> {
        let tcp = match pending {
            PendingData::Connected(tcp) => tcp,
            PendingData::Listening(listener) => {
                let (tcp, peer) = timeout(self.options.data_timeout(), listener.accept())
                    .await
                    .map_err(|_| self.fail(FtpError::data_channel("Data accept timed out")))?
                    .map_err(|e| self.fail(FtpError::data_channel(format!("Data accept: {}", e))))?;
                log::trace!("[{}] data connection from {}", self.id, peer);
                tcp
            }
        };

        if self.options.security != FtpSecurityMode::None {
            let tls = tls::wrap_stream(tcp, &self.endpoint.host, self.options.accept_invalid_certs)
                .await
                .map_err(|e| self.fail(e))?;
            Ok(NetStream::Tls(Box::new(tls)))
        } else {
            Ok(NetStream::Plain(tcp))
        }
    }

    // ─── PASV ────────────────────────────────────────────────────

    async fn open_pasv(&mut self) -> FtpResult<TcpStream> {
        let resp = self.expect_positive("PASV").await?;
        let addr = parse_pasv_response(&resp.text()).map_err(|e| self.fail(e))?;
        self.connect_data(addr, "PASV").await
    }

    // ─── EPSV ────────────────────────────────────────────────────

    /// The data port is on the host we are already talking to.
    async fn open_epsv(&mut self) -> FtpResult<TcpStream> {
        let resp = self.expect_positive("EPSV").await?;
        let port = parse_epsv_response(&resp.text()).map_err(|e| self.fail(e))?;
        let addr = SocketAddr::new(self.peer_addr()?.ip(), port);
        self.connect_data(addr, "EPSV").await
    }

    async fn connect_data(&self, addr: SocketAddr, mode: &str) -> FtpResult<TcpStream> {
        let tcp = timeout(self.options.data_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| self.fail(FtpError::data_channel(format!("{} data connect timed out", mode))))?
            .map_err(|e| self.fail(FtpError::data_channel(format!("{} data connect: {}", mode, e))))?;
        log::trace!("[{}] {} data connection to {}", self.id, mode, addr);
        Ok(tcp)
    }

    // ─── PORT / EPRT ─────────────────────────────────────────────

    /// Listen on the interface the control connection uses, unless told
    /// otherwise, so the advertised address is one the server can reach.
    async fn bind_active(&self) -> FtpResult<TcpListener> {
        let ip = match &self.options.active_bind_address {
            Some(addr) => addr
                .parse::<IpAddr>()
                .map_err(|e| FtpError::invalid_config(format!("Active bind address {}: {}", addr, e)))?,
            None => self.local_addr()?.ip(),
        };
        TcpListener::bind(SocketAddr::new(ip, 0))
            .await
            .map_err(|e| self.fail(FtpError::data_channel(format!("Data bind: {}", e))))
    }

    async fn open_port(&mut self) -> FtpResult<TcpListener> {
        let listener = self.bind_active().await?;
        let local = listener.local_addr()?;
        let cmd = port_command(local)?;
        self.expect_positive(&cmd).await?;
        Ok(listener)
    }

    async fn open_eprt(&mut self) -> FtpResult<TcpListener> {
        let listener = self.bind_active().await?;
        let local = listener.local_addr()?;
        self.expect_positive(&eprt_command(local)).await?;
        Ok(listener)
    }
}

/// Parse `(h1,h2,h3,h4,p1,p2)` from a 227 response.
fn parse_pasv_response(text: &str) -> FtpResult<SocketAddr> {
    let caps = PASV_ADDR
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse PASV: {}", text)))?;

    let nums: Vec<u8> = (1..=6)
        .map(|i| {
            caps[i]
                .parse::<u8>()
                .map_err(|_| FtpError::protocol_error("PASV number out of range"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + (nums[5] as u16);
    Ok(SocketAddr::new(ip, port))
}

/// Parse the port out of `229 Entering Extended Passive Mode (|||port|)`.
fn parse_epsv_response(text: &str) -> FtpResult<u16> {
    let caps = EPSV_PORT
        .captures(text)
        .ok_or_else(|| FtpError::protocol_error(format!("Cannot parse EPSV: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| FtpError::protocol_error("EPSV port out of range"))
}

fn port_command(local: SocketAddr) -> FtpResult<String> {
    let octets = match local.ip() {
        IpAddr::V4(v4) => v4.octets(),
        IpAddr::V6(_) => {
            return Err(FtpError::data_channel(
                "PORT requires IPv4; use extended active mode",
            ))
        }
    };
    let port = local.port();
    Ok(format!(
        "PORT {},{},{},{},{},{}",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        port / 256,
        port % 256
    ))
}

/// `EPRT |1|ip|port|` (1 = IPv4, 2 = IPv6).
fn eprt_command(local: SocketAddr) -> String {
    let af = match local.ip() {
        IpAddr::V4(_) => 1,
        IpAddr::V6(_) => 2,
    };
    format!("EPRT |{}|{}|{}|", af, local.ip(), local.port())
}

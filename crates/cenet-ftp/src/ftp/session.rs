//! One logged-in control connection, owned by a single request.
//!
//! Lifecycle: `open()` → optional AUTH TLS → USER/PASS → TYPE.
//! The dispatcher then issues its verb-specific commands and `close()`
//! sends QUIT. Every reply is remembered so a failure can carry the last
//! thing the server said.

use crate::ftp::connection::{self, NetStream};
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::protocol::FtpCodec;
use crate::ftp::tls;
use crate::ftp::types::{FtpEndpoint, FtpReply, FtpRequestOptions, FtpSecurityMode};
use std::net::SocketAddr;
use tokio::time::timeout;
use uuid::Uuid;

pub struct FtpSession {
    pub id: String,
    codec: Option<FtpCodec<NetStream>>,
    pub(crate) endpoint: FtpEndpoint,
    pub(crate) options: FtpRequestOptions,
    banner: FtpReply,
    welcome: Option<FtpReply>,
    last_reply: Option<FtpReply>,
    exit_reply: Option<FtpReply>,
}

impl FtpSession {
    /// Connect and log in.
    pub async fn open(endpoint: &FtpEndpoint, options: &FtpRequestOptions) -> FtpResult<Self> {
        if endpoint.host.is_empty() {
            return Err(FtpError::invalid_config("Host must not be empty"));
        }

        let id = Uuid::new_v4().to_string();
        let (codec, banner) = connection::connect(endpoint, options)
            .await
            .map_err(|e| e.with_session(id.clone()))?;
        log::debug!("[{}] banner: {}", id, banner.last_line());

        if banner.is_negative() {
            let code = banner.code().unwrap_or_default();
            return Err(FtpError::from_reply(code, &banner.text()).with_session(id));
        }

        let mut session = Self {
            id,
            codec: Some(codec),
            endpoint: endpoint.clone(),
            options: options.clone(),
            banner: banner.clone(),
            welcome: None,
            last_reply: Some(banner),
            exit_reply: None,
        };

        if let Err(e) = session.handshake().await {
            session.close().await;
            return Err(e);
        }
        Ok(session)
    }

    async fn handshake(&mut self) -> FtpResult<()> {
        if self.options.security == FtpSecurityMode::Explicit {
            let resp = self.command("AUTH TLS").await?;
            if !resp.is_completion() {
                return Err(self.fail(FtpError::tls_failed(format!(
                    "AUTH TLS rejected: {}",
                    resp.last_line()
                ))));
            }
            let plain = self.codec.take().ok_or_else(FtpError::stream_closed)?;
            let upgraded = tls::upgrade_to_tls(
                plain,
                &self.endpoint.host,
                self.options.accept_invalid_certs,
            )
            .await
            .map_err(|e| self.fail(e))?;
            self.codec = Some(upgraded);

            self.expect_positive("PBSZ 0").await?;
            self.expect_positive("PROT P").await?;
        }

        self.login().await?;

        let type_cmd = self.options.transfer_type.command();
        self.expect_positive(type_cmd).await?;
        Ok(())
    }

    async fn login(&mut self) -> FtpResult<()> {
        let user = self.options.credentials.login_name();
        let resp = self.command(&format!("USER {}", user)).await?;
        match resp.code() {
            Some(331) => {
                let pass = self.options.credentials.password.clone();
                let resp = self.command(&format!("PASS {}", pass)).await?;
                if resp.is_negative() || resp.is_intermediate() {
                    return Err(self.fail(login_error(&resp)));
                }
                self.welcome = Some(resp);
            }
            Some(332) => {
                return Err(self.fail(
                    FtpError::unsupported("Server requires an ACCT login").with_code(332),
                ));
            }
            _ if resp.is_negative() => return Err(self.fail(login_error(&resp))),
            _ => self.welcome = Some(resp),
        }
        log::debug!("[{}] logged in as {}", self.id, user);
        Ok(())
    }

    fn codec(&mut self) -> FtpResult<&mut FtpCodec<NetStream>> {
        self.codec
            .as_mut()
            .ok_or_else(|| FtpError::disconnected("Session is closed"))
    }

    /// Send one command and return whatever the server answered.
    pub async fn command(&mut self, cmd: &str) -> FtpResult<FtpReply> {
        let wait = self.options.reply_timeout();
        let codec = self.codec()?;
        let result = match timeout(wait, codec.execute(cmd)).await {
            Ok(r) => r,
            Err(_) => Err(FtpError::timeout(format!("No reply to {}", verb_of(cmd)))),
        };
        self.record(result)
    }

    /// Read a reply that was not prompted by a command (transfer completion).
    pub async fn read_reply(&mut self) -> FtpResult<FtpReply> {
        let wait = self.options.reply_timeout();
        let codec = self.codec()?;
        let result = match timeout(wait, codec.read_reply()).await {
            Ok(r) => r,
            Err(_) => Err(FtpError::timeout("Timed out waiting for transfer completion")),
        };
        self.record(result)
    }

    fn record(&mut self, result: FtpResult<FtpReply>) -> FtpResult<FtpReply> {
        match result {
            Ok(reply) => {
                self.last_reply = Some(reply.clone());
                Ok(reply)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Send `cmd` and turn a 4xx/5xx reply into an error. Replies without a
    /// code pass through.
    pub async fn expect_positive(&mut self, cmd: &str) -> FtpResult<FtpReply> {
        let reply = self.command(cmd).await?;
        self.check(reply)
    }

    /// Reject a negative reply that was already read.
    pub fn check(&self, reply: FtpReply) -> FtpResult<FtpReply> {
        match reply.code() {
            Some(code) if code >= 400 => {
                Err(FtpError::from_reply(code, &reply.text()).with_session(self.id.clone()))
            }
            _ => Ok(reply),
        }
    }

    pub async fn cwd(&mut self, dir: &str) -> FtpResult<FtpReply> {
        self.expect_positive(&format!("CWD {}", dir)).await
    }

    /// Send QUIT and drop the control connection. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(mut codec) = self.codec.take() {
            match timeout(self.options.reply_timeout(), codec.execute("QUIT")).await {
                Ok(Ok(reply)) => {
                    log::debug!("[{}] {}", self.id, reply.last_line());
                    self.exit_reply = Some(reply);
                }
                Ok(Err(e)) => log::debug!("[{}] QUIT failed: {}", self.id, e),
                Err(_) => log::debug!("[{}] QUIT timed out", self.id),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.codec.is_none()
    }

    pub fn banner(&self) -> &FtpReply {
        &self.banner
    }

    /// Reply that completed the login.
    pub fn welcome(&self) -> Option<&FtpReply> {
        self.welcome.as_ref()
    }

    pub fn last_reply(&self) -> Option<&FtpReply> {
        self.last_reply.as_ref()
    }

    pub fn exit_reply(&self) -> Option<&FtpReply> {
        self.exit_reply.as_ref()
    }

    /// Text of the most recent reply, multi-line replies included.
    pub fn last_response_text(&self) -> Option<String> {
        self.last_reply.as_ref().map(FtpReply::text)
    }

    fn control(&self) -> FtpResult<&NetStream> {
        self.codec
            .as_ref()
            .map(FtpCodec::get_ref)
            .ok_or_else(|| FtpError::disconnected("Session is closed"))
    }

    pub(crate) fn local_addr(&self) -> FtpResult<SocketAddr> {
        Ok(self.control()?.local_addr()?)
    }

    pub(crate) fn peer_addr(&self) -> FtpResult<SocketAddr> {
        Ok(self.control()?.peer_addr()?)
    }

    /// Decorate an error with the session id and last server reply.
    pub fn fail(&self, err: FtpError) -> FtpError {
        let err = if err.session_id.is_none() {
            err.with_session(self.id.clone())
        } else {
            err
        };
        err.with_server_text(self.last_response_text())
    }
}

fn login_error(resp: &FtpReply) -> FtpError {
    let mut err = FtpError::auth_failed(format!("Login failed: {}", resp.last_line()));
    if let Some(code) = resp.code() {
        err = err.with_code(code);
    }
    err.with_server_text(Some(resp.text()))
}

/// First word of a command; keeps arguments (passwords) out of messages.
fn verb_of(cmd: &str) -> &str {
    cmd.split_whitespace().next().unwrap_or(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftp::error::FtpErrorKind;
    use cenet_core::{NetworkCredential, WebExceptionStatus};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    /// Serve one control connection, answering each received line from `script`.
    async fn scripted(script: Vec<(&'static str, &'static str)>) -> FtpEndpoint {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            let (rd, mut wr) = sock.into_split();
            let mut rd = BufReader::new(rd);
            wr.write_all(b"220 ready\r\n").await.unwrap();
            for (expect, answer) in script {
                let mut line = String::new();
                if rd.read_line(&mut line).await.unwrap() == 0 {
                    return;
                }
                assert!(line.starts_with(expect), "got {:?}, wanted {}", line, expect);
                wr.write_all(answer.as_bytes()).await.unwrap();
            }
        });
        FtpEndpoint { host: "127.0.0.1".into(), port }
    }

    fn options(user: &str, pass: &str) -> FtpRequestOptions {
        FtpRequestOptions {
            credentials: NetworkCredential::new(user, pass),
            reply_timeout_sec: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_login_and_quit() {
        let endpoint = scripted(vec![
            ("USER bob", "331 need password\r\n"),
            ("PASS secret", "230 welcome\r\n"),
            ("TYPE I", "200 binary\r\n"),
            ("QUIT", "221 bye\r\n"),
        ])
        .await;
        let mut session = FtpSession::open(&endpoint, &options("bob", "secret")).await.unwrap();
        assert_eq!(session.banner().code(), Some(220));
        session.close().await;
        session.close().await;
        assert!(session.is_closed());
        assert_eq!(session.exit_reply().unwrap().code(), Some(221));
    }

    #[tokio::test]
    async fn test_bad_password_is_auth_failure_with_server_text() {
        let endpoint = scripted(vec![
            ("USER bob", "331 need password\r\n"),
            ("PASS nope", "530 Login incorrect.\r\n"),
            ("QUIT", "221 bye\r\n"),
        ])
        .await;
        let err = FtpSession::open(&endpoint, &options("bob", "nope"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind, FtpErrorKind::AuthFailed);
        assert_eq!(err.code, Some(530));
        assert_eq!(err.status, WebExceptionStatus::ProtocolError);
        assert_eq!(err.server_text.as_deref(), Some("530 Login incorrect."));
        assert!(err.session_id.is_some());
    }

    #[tokio::test]
    async fn test_rejected_command_carries_reply() {
        let endpoint = scripted(vec![
            ("USER anonymous", "230 ok\r\n"),
            ("TYPE I", "200 binary\r\n"),
            ("CWD /missing", "550 No such directory\r\n"),
        ])
        .await;
        let mut session = FtpSession::open(&endpoint, &FtpRequestOptions::default())
            .await
            .unwrap();
        let err = session.cwd("/missing").await.unwrap_err();
        assert_eq!(err.code, Some(550));
        assert_eq!(err.kind, FtpErrorKind::NotFound);
        assert_eq!(session.last_response_text().as_deref(), Some("550 No such directory"));
    }

    #[test]
    fn test_verb_of_hides_arguments() {
        assert_eq!(verb_of("PASS hunter2"), "PASS");
        assert_eq!(verb_of("NOOP"), "NOOP");
    }
}

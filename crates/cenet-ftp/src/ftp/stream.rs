//! Data streams handed to callers.
//!
//! An `FtpDataStream` owns both the data socket and the session whose
//! control connection will report the transfer outcome. Closing it drops
//! the data socket, waits for the completion reply and sends QUIT.

use crate::ftp::connection::NetStream;
use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::response::FtpWebResponse;
use crate::ftp::session::FtpSession;
use crate::ftp::types::FtpReply;
use cenet_core::AbortSignal;
use futures::FutureExt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Read,
    Write,
}

pub struct FtpDataStream {
    direction: StreamDirection,
    data: Option<BufReader<NetStream>>,
    session: Option<FtpSession>,
    /// False when the server already reported completion with the verb.
    awaiting_completion: bool,
    completion: Option<FtpReply>,
    exit: Option<FtpReply>,
    abort: AbortSignal,
    transferred: u64,
}

impl FtpDataStream {
    pub(crate) fn new(
        direction: StreamDirection,
        data: NetStream,
        session: FtpSession,
        abort: AbortSignal,
    ) -> Self {
        Self {
            direction,
            data: Some(BufReader::new(data)),
            session: Some(session),
            awaiting_completion: true,
            completion: None,
            exit: None,
            abort,
            transferred: 0,
        }
    }

    /// The verb's own reply was already the completion reply.
    pub(crate) fn completed_early(mut self, reply: FtpReply) -> Self {
        self.awaiting_completion = false;
        self.completion = Some(reply);
        self
    }

    pub fn direction(&self) -> StreamDirection {
        self.direction
    }

    pub fn can_read(&self) -> bool {
        self.direction == StreamDirection::Read && self.data.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.direction == StreamDirection::Write && self.data.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.data.is_none()
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.transferred
    }

    /// Bytes readable right now without waiting.
    pub fn available(&mut self) -> usize {
        if self.direction != StreamDirection::Read {
            return 0;
        }
        match self.data.as_mut() {
            Some(data) => match data.fill_buf().now_or_never() {
                Some(Ok(buf)) => buf.len(),
                _ => 0,
            },
            None => 0,
        }
    }

    /// Completion reply read by `close()`.
    pub fn completion(&self) -> Option<&FtpReply> {
        self.completion.as_ref()
    }

    /// QUIT reply read by `close()`.
    pub fn exit_reply(&self) -> Option<&FtpReply> {
        self.exit.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.id.as_str())
    }

    /// Finish the transfer. Idempotent; only the first call talks to the
    /// server.
    pub async fn close(&mut self) -> FtpResult<()> {
        let mut data = match self.data.take() {
            Some(data) => data,
            None => return Ok(()),
        };

        let mut outcome = Ok(());
        if self.direction == StreamDirection::Write {
            if let Err(e) = data.shutdown().await {
                outcome = Err(FtpError::from(e));
            }
        }
        drop(data);

        if let Some(mut session) = self.session.take() {
            if self.awaiting_completion {
                match session.read_reply().await {
                    Ok(reply) => {
                        let checked = session.check(reply.clone());
                        self.completion = Some(reply);
                        if let Err(e) = checked {
                            outcome = outcome.and(Err(e));
                        }
                    }
                    Err(e) => outcome = outcome.and(Err(e)),
                }
            }
            session.close().await;
            self.exit = session.exit_reply().cloned();
            outcome = outcome.map_err(|e| session.fail(e));
        }
        outcome
    }

    fn guard(&self, wanted: StreamDirection) -> io::Result<()> {
        if self.direction != wanted {
            let msg = match wanted {
                StreamDirection::Read => "stream is write-only",
                StreamDirection::Write => "stream is read-only",
            };
            return Err(FtpError::unsupported(msg).into());
        }
        if self.abort.is_aborted() {
            return Err(FtpError::canceled().into());
        }
        Ok(())
    }
}

fn closed() -> io::Error {
    FtpError::stream_closed().into()
}

impl AsyncRead for FtpDataStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        this.guard(StreamDirection::Read)?;
        let data = match this.data.as_mut() {
            Some(data) => data,
            None => return Poll::Ready(Err(closed())),
        };
        let before = buf.filled().len();
        let poll = Pin::new(data).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            this.transferred += (buf.filled().len() - before) as u64;
        }
        poll
    }
}

impl AsyncWrite for FtpDataStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        this.guard(StreamDirection::Write)?;
        let data = match this.data.as_mut() {
            Some(data) => data,
            None => return Poll::Ready(Err(closed())),
        };
        let poll = Pin::new(data).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = poll {
            this.transferred += n as u64;
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match (this.direction, this.data.as_mut()) {
            (StreamDirection::Write, Some(data)) => Pin::new(data).poll_flush(cx),
            _ => Poll::Ready(Ok(())),
        }
    }

    /// Half-closes the data socket. The completion reply is only read by
    /// `close()`.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match (this.direction, this.data.as_mut()) {
            (StreamDirection::Write, Some(data)) => Pin::new(data).poll_shutdown(cx),
            _ => Poll::Ready(Ok(())),
        }
    }
}

/// The body of an upload. Write into it, then call `finish` to learn how
/// the server took it.
pub struct FtpRequestStream {
    inner: FtpDataStream,
    response: FtpWebResponse,
}

impl FtpRequestStream {
    pub(crate) fn new(inner: FtpDataStream, response: FtpWebResponse) -> Self {
        Self { inner, response }
    }

    /// Where the body is going. For STOU this already carries the name the
    /// server assigned.
    pub fn response_uri(&self) -> &Url {
        self.response.response_uri()
    }

    pub fn bytes_written(&self) -> u64 {
        self.inner.bytes_transferred()
    }

    pub fn can_write(&self) -> bool {
        self.inner.can_write()
    }

    /// Close the data channel without building a response. Idempotent.
    pub async fn close(&mut self) -> FtpResult<()> {
        self.inner.close().await
    }

    /// Close the data channel and return the response for the upload.
    pub async fn finish(mut self) -> FtpResult<FtpWebResponse> {
        self.inner.close().await?;
        if let Some(reply) = self.inner.completion() {
            self.response.set_reply(reply);
        }
        self.response.exit_message = self.inner.exit_reply().map(FtpReply::text);
        Ok(self.response)
    }
}

impl AsyncWrite for FtpRequestStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl std::fmt::Debug for FtpRequestStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpRequestStream")
            .field("response_uri", &self.response_uri().as_str())
            .field("bytes_written", &self.bytes_written())
            .finish()
    }
}

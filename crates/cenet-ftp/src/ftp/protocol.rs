//! Low-level FTP command/reply codec (RFC 959 §4).
//!
//! Handles:
//! - Sending FTP commands terminated with `\r\n`
//! - Reading single-line and multi-line replies
//!
//! The codec never fails on a reply it cannot classify: a line that does not
//! start with a code is taken as a complete single-line reply and its status
//! reads as `Undefined`.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::types::FtpReply;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Command/reply codec over any duplex byte stream.
pub struct FtpCodec<S> {
    stream: BufReader<S>,
}

impl<S> FtpCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Give back the underlying stream. Anything still buffered is lost, so
    /// only call this at a reply boundary (e.g. right after `234`).
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    /// Send a raw FTP command. The trailing CRLF is added here.
    pub async fn send_command(&mut self, cmd: &str) -> FtpResult<()> {
        let line = format!("{}\r\n", cmd);
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.flush().await?;
        if is_pass_command(cmd) {
            log::trace!(">>> PASS ***");
        } else {
            log::trace!(">>> {}", cmd);
        }
        Ok(())
    }

    /// Read a single line from the control channel, without the line ending.
    async fn read_line(&mut self) -> FtpResult<String> {
        let mut buf = Vec::new();
        let n = self.stream.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Err(FtpError::disconnected("Server closed connection"));
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(line.trim_end_matches(|c| c == '\r' || c == '\n').to_string())
    }

    /// Read a complete FTP reply (possibly multi-line).
    ///
    /// Multi-line replies look like:
    /// ```text
    /// 220-Welcome to my FTP server
    /// This is line 2
    /// 220 End of greeting
    /// ```
    pub async fn read_reply(&mut self) -> FtpResult<FtpReply> {
        let first = self.read_line().await?;
        let mut lines = vec![first];

        // "NNN-" opens a multi-line reply that runs until "NNN " (or a bare "NNN").
        if let Some(code) = multiline_opener(&lines[0]).map(str::to_owned) {
            let terminator = format!("{} ", code);
            loop {
                let next = self.read_line().await?;
                let done = next.starts_with(&terminator) || next == code;
                lines.push(next);
                if done {
                    break;
                }
            }
        }

        let reply = FtpReply::new(lines);
        log::trace!("<<< {}", reply.last_line());
        Ok(reply)
    }

    /// Send a command and return the reply.
    pub async fn execute(&mut self, cmd: &str) -> FtpResult<FtpReply> {
        self.send_command(cmd).await?;
        self.read_reply().await
    }
}

fn is_pass_command(cmd: &str) -> bool {
    cmd.split_whitespace()
        .next()
        .map_or(false, |verb| verb.eq_ignore_ascii_case("PASS"))
}

/// `Some("220")` for a line like `220-Welcome`.
fn multiline_opener(line: &str) -> Option<&str> {
    let bytes = line.as_bytes();
    if bytes.len() >= 4 && bytes[..3].iter().all(u8::is_ascii_digit) && bytes[3] == b'-' {
        Some(&line[..3])
    } else {
        None
    }
}

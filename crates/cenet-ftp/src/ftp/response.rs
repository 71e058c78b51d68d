//! The result of one FTP request.

use crate::ftp::error::{FtpError, FtpResult};
use crate::ftp::parser;
use crate::ftp::status::FtpStatusCode;
use crate::ftp::stream::FtpDataStream;
use crate::ftp::types::{FtpEntry, FtpReply};
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use url::Url;

/// Everything the server told us about a request, plus the data stream
/// for RETR, NLST and LIST.
///
/// Fields are filled in while the request runs and never change after
/// that, except that closing a streaming response records the
/// completion reply.
pub struct FtpWebResponse {
    pub(crate) response_uri: Url,
    pub(crate) status: FtpStatusCode,
    pub(crate) status_description: String,
    pub(crate) reply_text: String,
    pub(crate) banner_message: Option<String>,
    pub(crate) welcome_message: Option<String>,
    pub(crate) exit_message: Option<String>,
    pub(crate) last_modified: Option<DateTime<Utc>>,
    pub(crate) content_length: Option<u64>,
    pub(crate) reported_path: Option<String>,
    pub(crate) stream: Option<FtpDataStream>,
}

impl FtpWebResponse {
    pub(crate) fn new(response_uri: Url, reply: &FtpReply) -> Self {
        Self {
            response_uri,
            status: reply.status(),
            status_description: reply.last_line().to_string(),
            reply_text: reply.text(),
            banner_message: None,
            welcome_message: None,
            exit_message: None,
            last_modified: None,
            content_length: None,
            reported_path: None,
            stream: None,
        }
    }

    pub(crate) fn set_reply(&mut self, reply: &FtpReply) {
        self.status = reply.status();
        self.status_description = reply.last_line().to_string();
        self.reply_text = reply.text();
    }

    /// Where the operation actually happened. Differs from the request URI
    /// only for STOU, where the server picks the name.
    pub fn response_uri(&self) -> &Url {
        &self.response_uri
    }

    pub fn status_code(&self) -> FtpStatusCode {
        self.status
    }

    /// Last line of the final reply.
    pub fn status_description(&self) -> &str {
        &self.status_description
    }

    /// Every line of the final reply.
    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn banner_message(&self) -> Option<&str> {
        self.banner_message.as_deref()
    }

    pub fn welcome_message(&self) -> Option<&str> {
        self.welcome_message.as_deref()
    }

    pub fn exit_message(&self) -> Option<&str> {
        self.exit_message.as_deref()
    }

    /// From MDTM.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// From SIZE, or from the `(N bytes)` announcement of RETR.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Path quoted in a PWD or MKD reply.
    pub fn reported_path(&self) -> Option<&str> {
        self.reported_path.as_deref()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.is_some()
    }

    /// Borrow the data stream of a download or listing.
    pub fn get_response_stream(&mut self) -> FtpResult<&mut FtpDataStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| FtpError::unsupported("This response has no data stream"))
    }

    /// Take ownership of the data stream. The caller then owns closing it.
    pub fn take_stream(&mut self) -> Option<FtpDataStream> {
        self.stream.take()
    }

    /// Close the data stream, if any, and record how the transfer ended.
    /// Idempotent.
    pub async fn close(&mut self) -> FtpResult<()> {
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Ok(()),
        };
        let outcome = stream.close().await;
        let completion = stream.completion().cloned();
        let exit = stream.exit_reply().map(FtpReply::text);
        self.stream = None;
        if let Some(reply) = completion {
            self.set_reply(&reply);
        }
        if exit.is_some() {
            self.exit_message = exit;
        }
        outcome
    }

    /// Read the whole data stream and close the response.
    pub async fn into_bytes(mut self) -> FtpResult<Vec<u8>> {
        let mut body = Vec::new();
        if let Some(stream) = self.stream.as_mut() {
            if let Err(e) = stream.read_to_end(&mut body).await {
                let _ = self.close().await;
                return Err(e.into());
            }
        }
        self.close().await?;
        Ok(body)
    }

    /// Read and parse a LIST/MLSD body.
    pub async fn read_listing(self) -> FtpResult<Vec<FtpEntry>> {
        let body = self.into_bytes().await?;
        Ok(parser::parse_listing(&String::from_utf8_lossy(&body)))
    }

    /// Read and parse an NLST body.
    pub async fn read_names(self) -> FtpResult<Vec<String>> {
        let body = self.into_bytes().await?;
        Ok(parser::parse_names(&String::from_utf8_lossy(&body)))
    }
}

impl std::fmt::Debug for FtpWebResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpWebResponse")
            .field("response_uri", &self.response_uri.as_str())
            .field("status", &self.status)
            .field("status_description", &self.status_description)
            .field("content_length", &self.content_length)
            .field("has_stream", &self.stream.is_some())
            .finish()
    }
}

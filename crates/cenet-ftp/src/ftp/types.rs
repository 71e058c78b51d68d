//! Shared types for the FTP crate.

use crate::ftp::path::PathKindPolicy;
use crate::ftp::reply;
use crate::ftp::status::FtpStatusCode;
use cenet_core::NetworkCredential;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

// ─── Connection / Session ────────────────────────────────────────────

/// Security mode for the control channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FtpSecurityMode {
    /// Plain-text FTP (port 21).
    None,
    /// Explicit FTPS: starts plain, then upgrades via AUTH TLS (port 21).
    Explicit,
    /// Implicit FTPS: TLS from the first byte (port 990).
    Implicit,
}

impl Default for FtpSecurityMode {
    fn default() -> Self {
        Self::None
    }
}

/// Transfer type (RFC 959 TYPE command).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TransferType {
    Ascii,
    Binary,
}

impl Default for TransferType {
    fn default() -> Self {
        Self::Binary
    }
}

impl TransferType {
    pub fn command(self) -> &'static str {
        match self {
            Self::Ascii => "TYPE A",
            Self::Binary => "TYPE I",
        }
    }
}

/// How the data channel is established.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DataChannelMode {
    Passive,
    ExtendedPassive,
    Active,
    ExtendedActive,
}

impl Default for DataChannelMode {
    fn default() -> Self {
        Self::Passive
    }
}

/// Per-request options. Deserializable so callers can load them from a
/// config file; every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpRequestOptions {
    #[serde(default)]
    pub credentials: NetworkCredential,
    #[serde(default)]
    pub security: FtpSecurityMode,
    #[serde(default)]
    pub transfer_type: TransferType,
    #[serde(default)]
    pub data_channel_mode: DataChannelMode,
    /// How directory-addressed verbs (LIST, NLST, PWD, STOU) read the path.
    #[serde(default)]
    pub path_kind: PathKindPolicy,
    /// TCP connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_sec: u64,
    /// Maximum wait for any single control-channel reply.
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_sec: u64,
    /// Data-channel connect/accept timeout in seconds.
    #[serde(default = "default_data_timeout")]
    pub data_timeout_sec: u64,
    /// Accept self-signed / untrusted certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    /// Local address to bind for active-mode data connections.
    #[serde(default)]
    pub active_bind_address: Option<String>,
    /// Byte offset sent with REST before RETR/STOR (0 = none).
    #[serde(default)]
    pub content_offset: u64,
    /// Target name for `Rename`.
    #[serde(default)]
    pub rename_to: Option<String>,
}

fn default_connect_timeout() -> u64 {
    15
}
fn default_reply_timeout() -> u64 {
    100
}
fn default_data_timeout() -> u64 {
    30
}

impl Default for FtpRequestOptions {
    fn default() -> Self {
        Self {
            credentials: NetworkCredential::anonymous(),
            security: FtpSecurityMode::None,
            transfer_type: TransferType::Binary,
            data_channel_mode: DataChannelMode::Passive,
            path_kind: PathKindPolicy::default(),
            connect_timeout_sec: default_connect_timeout(),
            reply_timeout_sec: default_reply_timeout(),
            data_timeout_sec: default_data_timeout(),
            accept_invalid_certs: false,
            active_bind_address: None,
            content_offset: 0,
            rename_to: None,
        }
    }
}

impl FtpRequestOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_sec)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_sec)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data_timeout_sec)
    }
}

/// Resolved control-channel endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for FtpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

// ─── Methods ─────────────────────────────────────────────────────────

/// The operation a request performs. Fixed once the request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FtpMethod {
    DownloadFile,
    UploadFile,
    DeleteFile,
    ListDirectory,
    ListDirectoryDetails,
    MakeDirectory,
    RemoveDirectory,
    Rename,
    AppendFile,
    GetDateTimestamp,
    GetFileSize,
    UploadFileWithUniqueName,
    PrintWorkingDirectory,
    /// Sent verbatim after entering the request directory.
    Raw(String),
}

/// Which part of the request path a verb operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// The verb takes the leaf name; the parent is entered with CWD.
    Leaf,
    /// The verb works on a directory; the path may or may not carry a leaf.
    Directory,
}

impl Default for FtpMethod {
    fn default() -> Self {
        Self::DownloadFile
    }
}

impl FtpMethod {
    /// The method string, which is also the wire verb except for `RENAME`.
    pub fn verb(&self) -> &str {
        match self {
            Self::DownloadFile => "RETR",
            Self::UploadFile => "STOR",
            Self::DeleteFile => "DELE",
            Self::ListDirectory => "NLST",
            Self::ListDirectoryDetails => "LIST",
            Self::MakeDirectory => "MKD",
            Self::RemoveDirectory => "RMD",
            Self::Rename => "RENAME",
            Self::AppendFile => "APPE",
            Self::GetDateTimestamp => "MDTM",
            Self::GetFileSize => "SIZE",
            Self::UploadFileWithUniqueName => "STOU",
            Self::PrintWorkingDirectory => "PWD",
            Self::Raw(cmd) => cmd.as_str(),
        }
    }

    /// Parse a method string. Unknown strings become `Raw`.
    pub fn from_verb(verb: &str) -> Self {
        match verb.trim().to_ascii_uppercase().as_str() {
            "RETR" => Self::DownloadFile,
            "STOR" => Self::UploadFile,
            "DELE" => Self::DeleteFile,
            "NLST" => Self::ListDirectory,
            "LIST" => Self::ListDirectoryDetails,
            "MKD" => Self::MakeDirectory,
            "RMD" => Self::RemoveDirectory,
            "RENAME" => Self::Rename,
            "APPE" => Self::AppendFile,
            "MDTM" => Self::GetDateTimestamp,
            "SIZE" => Self::GetFileSize,
            "STOU" => Self::UploadFileWithUniqueName,
            "PWD" => Self::PrintWorkingDirectory,
            _ => Self::Raw(verb.trim().to_string()),
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(
            self,
            Self::UploadFile | Self::AppendFile | Self::UploadFileWithUniqueName
        )
    }

    /// Verbs whose response carries a readable data stream.
    pub fn is_download(&self) -> bool {
        matches!(
            self,
            Self::DownloadFile | Self::ListDirectory | Self::ListDirectoryDetails
        )
    }

    pub fn addressing(&self) -> Addressing {
        match self {
            Self::ListDirectory
            | Self::ListDirectoryDetails
            | Self::PrintWorkingDirectory
            | Self::UploadFileWithUniqueName
            | Self::Raw(_) => Addressing::Directory,
            _ => Addressing::Leaf,
        }
    }
}

impl fmt::Display for FtpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

// ─── FTP Reply ───────────────────────────────────────────────────────

/// A single control-channel reply (may be multi-line).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FtpReply {
    pub lines: Vec<String>,
}

impl FtpReply {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Full reply text (all lines joined).
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// The line the status is read from.
    pub fn last_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or("")
    }

    /// Numeric code of the last line, if it has one.
    pub fn code(&self) -> Option<u16> {
        reply::code_of(self.last_line())
    }

    pub fn status(&self) -> FtpStatusCode {
        self.code()
            .map(FtpStatusCode::from_code)
            .unwrap_or(FtpStatusCode::Undefined)
    }

    /// Whether this is a positive-preliminary reply (1xx).
    pub fn is_preliminary(&self) -> bool {
        matches!(self.code(), Some(100..=199))
    }

    /// Whether this is a positive-completion reply (2xx).
    pub fn is_completion(&self) -> bool {
        matches!(self.code(), Some(200..=299))
    }

    /// Whether this is a positive-intermediate reply (3xx).
    pub fn is_intermediate(&self) -> bool {
        matches!(self.code(), Some(300..=399))
    }

    /// 4xx or 5xx. A reply without a parsable code is never negative.
    pub fn is_negative(&self) -> bool {
        matches!(self.code(), Some(c) if c >= 400)
    }
}

// ─── Directory Listing ───────────────────────────────────────────────

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FtpEntryKind {
    File,
    Directory,
    Symlink,
    Unknown,
}

/// One entry from a directory listing (parsed from LIST or MLSD output).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtpEntry {
    pub name: String,
    pub kind: FtpEntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub permissions: Option<String>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub link_target: Option<String>,
    /// MLSD fact map (e.g. "type" → "file", "size" → "1234").
    #[serde(default)]
    pub facts: HashMap<String, String>,
}

impl FtpEntry {
    pub(crate) fn named(name: impl Into<String>, kind: FtpEntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: 0,
            modified: None,
            permissions: None,
            owner: None,
            group: None,
            link_target: None,
            facts: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs_round_trip_through_method_strings() {
        for verb in ["RETR", "stor", "Dele", "NLST", "LIST", "MKD", "RMD", "RENAME", "APPE", "MDTM", "SIZE", "STOU", "PWD"] {
            let method = FtpMethod::from_verb(verb);
            assert!(!matches!(method, FtpMethod::Raw(_)), "{}", verb);
            assert_eq!(method.verb(), verb.to_ascii_uppercase());
        }
        assert_eq!(FtpMethod::from_verb("SITE HELP"), FtpMethod::Raw("SITE HELP".into()));
    }

    #[test]
    fn test_reply_status_from_last_line() {
        let reply = FtpReply::new(vec![
            "211-Features:".into(),
            " SIZE".into(),
            "211 End".into(),
        ]);
        assert_eq!(reply.code(), Some(211));
        assert!(reply.is_completion());
        assert!(!reply.is_negative());
    }

    #[test]
    fn test_reply_without_code_is_undefined_not_negative() {
        let reply = FtpReply::new(vec!["220-hello".into(), "garbage".into()]);
        assert_eq!(reply.status(), FtpStatusCode::Undefined);
        assert!(!reply.is_negative());
        assert!(!reply.is_completion());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: FtpRequestOptions =
            serde_json::from_str(r#"{"security":"explicit","contentOffset":10}"#).unwrap();
        assert_eq!(opts.security, FtpSecurityMode::Explicit);
        assert_eq!(opts.content_offset, 10);
        assert_eq!(opts.connect_timeout_sec, 15);
        assert_eq!(opts.credentials.user_name, "anonymous");
    }

    #[test]
    fn test_endpoint_display_brackets_ipv6() {
        let ep = FtpEndpoint { host: "::1".into(), port: 21 };
        assert_eq!(ep.to_string(), "[::1]:21");
    }
}

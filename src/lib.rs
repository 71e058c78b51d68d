//! # cenet
//!
//! FTP and `file://` web requests over tokio.
//!
//! - [`ftp`]: `FtpWebRequest` / `FtpWebResponse` and the FTP protocol layer
//! - [`web`]: `WebRequest` scheme dispatch and `WebClient`
//! - [`common`]: failure buckets, credentials, abort signal, I/O guard

pub use cenet_core as common;
pub use cenet_ftp as ftp;
pub use cenet_web as web;

pub use cenet_core::{AbortSignal, NetworkCredential, WebExceptionStatus};
pub use cenet_ftp::{
    FtpError, FtpMethod, FtpRequestOptions, FtpStatusCode, FtpWebRequest, FtpWebResponse,
    PathKindPolicy,
};
pub use cenet_web::{WebClient, WebClientConfig, WebError, WebRequest, WebResponse};

//! # cenet-ftp: FTP web requests
//!
//! One request, one session: each `FtpWebRequest` opens its own control
//! connection, runs a fixed command sequence for its method and closes.
//!
//! - **RFC 959**: command/reply exchange, PASV/PORT data channels
//! - **RFC 2228 / 4217**: AUTH TLS (Explicit) and Implicit FTPS
//! - **RFC 2428**: EPSV / EPRT
//! - **RFC 3659**: SIZE, MDTM, REST, MLSD listings
//!
//! Architecture:
//! - `types`: methods, options, replies, listing entries
//! - `status`: closed `FtpStatusCode` enumeration
//! - `error`: FTP error type, bucketed into `WebExceptionStatus`
//! - `reply`: reading codes, names, sizes and timestamps out of reply text
//! - `protocol`: low-level command/reply codec
//! - `connection`: TCP + TLS transport
//! - `tls`: rustls connector and TLS upgrade
//! - `session`: one logged-in control connection
//! - `transfer`: data channel setup (PASV/EPSV/PORT/EPRT)
//! - `path`: splitting URI paths into directory and operand
//! - `parser`: Unix/Windows/MLSD listing parsing
//! - `request`: `FtpWebRequest`
//! - `dispatch`: per-method command sequences
//! - `response`: `FtpWebResponse`
//! - `stream`: download and upload data streams

pub mod types;
pub mod status;
pub mod error;
pub mod reply;
pub mod protocol;
pub mod connection;
pub mod tls;
pub mod session;
pub mod transfer;
pub mod path;
pub mod parser;
pub mod request;
mod dispatch;
pub mod response;
pub mod stream;

pub use error::{FtpError, FtpErrorKind, FtpResult};
pub use path::{PathKindPolicy, RemoteTarget};
pub use request::FtpWebRequest;
pub use response::FtpWebResponse;
pub use status::FtpStatusCode;
pub use stream::{FtpDataStream, FtpRequestStream, StreamDirection};
pub use types::*;

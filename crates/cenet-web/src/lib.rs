//! # cenet-web
//!
//! Scheme dispatch on top of the transports:
//! - `request`: `WebRequest::create` picks the FTP or file implementation
//! - `file`: `file://` GET and PUT
//! - `client`: `WebClient` convenience calls with a no-overlap guard
//! - `error`: `WebError`

pub mod client;
pub mod error;
pub mod file;
pub mod request;

pub use client::{WebClient, WebClientConfig};
pub use error::{WebError, WebResult};
pub use file::{FileWebRequest, FileWebResponse};
pub use request::{RequestStream, WebRequest, WebResponse};

//! # cenet-core
//!
//! Primitives shared by the FTP and web crates:
//! - `status`: coarse `WebExceptionStatus` buckets and OS error mapping
//! - `credential`: `NetworkCredential`
//! - `guard`: the no-concurrent-I/O nesting counter
//! - `abort`: best-effort cancellation signal

pub mod abort;
pub mod credential;
pub mod guard;
pub mod status;

pub use abort::AbortSignal;
pub use credential::NetworkCredential;
pub use guard::{ConcurrentIo, IoGuard, IoToken};
pub use status::WebExceptionStatus;

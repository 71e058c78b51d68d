//! Splitting a request path into the directory to enter and the operand.

use crate::ftp::types::Addressing;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

/// How a directory-addressed verb (LIST, NLST, PWD, STOU) reads its path.
///
/// Leaf-addressed verbs always split at the last `/`, so this only matters
/// when a path could name either a directory or a file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PathKindPolicy {
    /// A last segment without a `.` is a directory, anything else a file.
    Heuristic,
    /// The whole path is a directory.
    Directory,
    /// The last segment is a file inside its parent.
    File,
}

impl Default for PathKindPolicy {
    fn default() -> Self {
        Self::Heuristic
    }
}

/// Where a command runs and what it operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Directory to CWD into. `/` means "stay where the login put us".
    pub directory: String,
    pub leaf: Option<String>,
}

impl RemoteTarget {
    pub fn is_root(&self) -> bool {
        self.directory == "/"
    }

    /// Directory joined with `name`.
    pub fn join(&self, name: &str) -> String {
        if self.is_root() {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.directory, name)
        }
    }
}

pub fn split_remote_path(path: &str, addressing: Addressing, policy: PathKindPolicy) -> RemoteTarget {
    let split = split_at_last_slash(path);
    match addressing {
        Addressing::Leaf => split,
        Addressing::Directory => match policy {
            PathKindPolicy::File => split,
            PathKindPolicy::Directory => whole_directory(path),
            PathKindPolicy::Heuristic => match &split.leaf {
                Some(leaf) if leaf.contains('.') => split,
                _ => whole_directory(path),
            },
        },
    }
}

fn split_at_last_slash(path: &str) -> RemoteTarget {
    match path.rfind('/') {
        Some(idx) => {
            let dir = trim_dir(&path[..idx]);
            let leaf = &path[idx + 1..];
            RemoteTarget {
                directory: dir,
                leaf: if leaf.is_empty() { None } else { Some(leaf.to_string()) },
            }
        }
        None => RemoteTarget {
            directory: "/".into(),
            leaf: if path.is_empty() { None } else { Some(path.to_string()) },
        },
    }
}

fn whole_directory(path: &str) -> RemoteTarget {
    RemoteTarget {
        directory: trim_dir(path),
        leaf: None,
    }
}

fn trim_dir(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".into()
    } else {
        trimmed.to_string()
    }
}

/// Characters escaped inside one path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Decode a URL path into the name the server sees.
pub fn decode_path(encoded: &str) -> String {
    let decoded = decode_component(encoded);
    if decoded.is_empty() {
        "/".into()
    } else {
        decoded
    }
}

/// Decode one URI component (user name, password).
pub fn decode_component(encoded: &str) -> String {
    percent_decode_str(encoded).decode_utf8_lossy().into_owned()
}

/// Encode a server path for use as a URL path, segment by segment.
pub fn encode_path(decoded: &str) -> String {
    decoded
        .split('/')
        .map(|seg| utf8_percent_encode(seg, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

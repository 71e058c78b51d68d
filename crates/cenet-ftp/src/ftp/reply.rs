//! Reply-line parsing.
//!
//! Every helper here is total: a reply that does not have the expected shape
//! yields `None` (or `Undefined`) and the caller carries on.

use crate::ftp::status::FtpStatusCode;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `150 Opening BINARY mode data connection for a.txt (4096 bytes)`
    static ref ANNOUNCED_LENGTH: Regex = Regex::new(r"\((\d+) bytes\)").unwrap();
}

/// Code from the first whitespace-delimited token of `line`.
pub fn code_of(line: &str) -> Option<u16> {
    let token = line.split_whitespace().next()?;
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse::<u16>().ok()
}

/// Last non-empty line of a (possibly multi-line) reply text.
pub fn last_line_of(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
}

/// Status of a raw multi-line reply, read from its last line.
pub fn status_code_of(text: &str) -> FtpStatusCode {
    code_of(last_line_of(text))
        .map(FtpStatusCode::from_code)
        .unwrap_or(FtpStatusCode::Undefined)
}

/// Server-assigned name from a STOU reply line: the token after the last
/// space, with trailing periods removed.
///
/// `150 FILE: upload.1` → `upload.1`, `250 Stored as foo.txt.` → `foo.txt`
pub fn unique_filename_of(line: &str) -> Option<String> {
    let line = line.trim_end();
    let pos = line.rfind(' ')?;
    let name = line[pos + 1..].trim_end_matches('.');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// MDTM reply: `213 YYYYMMDDHHMMSS[.fff]`, always UTC.
pub fn timestamp_of(line: &str) -> Option<DateTime<Utc>> {
    let token = line.split_whitespace().nth(1)?;
    parse_ftp_time(token)
}

/// Parse an RFC 3659 time-val, ignoring any fractional seconds.
pub fn parse_ftp_time(s: &str) -> Option<DateTime<Utc>> {
    let base = s.split('.').next()?;
    if base.len() != 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(base, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// SIZE reply: `213 12345`.
pub fn size_of(line: &str) -> Option<u64> {
    line.split_whitespace().nth(1)?.parse::<u64>().ok()
}

/// Path from a 257 reply: `257 "/some/path" created`. Doubled quotes inside
/// the path stand for one quote.
pub fn quoted_path_of(text: &str) -> Option<String> {
    let start = text.find('"')?;
    let mut out = String::new();
    let mut chars = text[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return Some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

/// Byte count some servers announce in the RETR preliminary reply.
pub fn announced_length_of(text: &str) -> Option<u64> {
    ANNOUNCED_LENGTH
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_last_line_of_multiline_text() {
        let text = "230-Welcome\n230-Second line\n230 Logged in";
        assert_eq!(status_code_of(text), FtpStatusCode::LoggedInProceed);
    }

    #[test]
    fn test_unparsable_last_line_is_undefined() {
        let text = "213-Status follows\nno code here";
        assert_eq!(status_code_of(text), FtpStatusCode::Undefined);
        assert_eq!(status_code_of(""), FtpStatusCode::Undefined);
        assert_eq!(code_of("+12 hello"), None);
        assert_eq!(code_of("226-Partial"), None);
    }

    #[test]
    fn test_unique_filename_strips_trailing_periods() {
        assert_eq!(unique_filename_of("150 FILE: upload.1").as_deref(), Some("upload.1"));
        assert_eq!(
            unique_filename_of("226 Transfer complete, stored as report.txt...").as_deref(),
            Some("report.txt")
        );
        assert_eq!(unique_filename_of("250 ."), None);
        assert_eq!(unique_filename_of("nospace"), None);
    }

    #[test]
    fn test_mdtm_timestamp() {
        let ts = timestamp_of("213 20140101120000").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2014, 1, 1, 12, 0, 0).unwrap());
        let frac = timestamp_of("213 20140101120000.250").unwrap();
        assert_eq!(frac, ts);
        assert!(timestamp_of("213 2014").is_none());
        assert!(timestamp_of("213").is_none());
    }

    #[test]
    fn test_size() {
        assert_eq!(size_of("213 4096"), Some(4096));
        assert_eq!(size_of("213 lots"), None);
    }

    #[test]
    fn test_quoted_path_with_escaped_quote() {
        assert_eq!(quoted_path_of("257 \"/home/ftp\" is cwd").as_deref(), Some("/home/ftp"));
        assert_eq!(quoted_path_of("257 \"/a\"\"b\" created").as_deref(), Some("/a\"b"));
        assert_eq!(quoted_path_of("257 no quotes"), None);
    }

    #[test]
    fn test_announced_length() {
        let line = "150 Opening BINARY mode data connection for a.txt (4096 bytes).";
        assert_eq!(announced_length_of(line), Some(4096));
        assert_eq!(announced_length_of("150 Here comes the directory listing."), None);
    }
}

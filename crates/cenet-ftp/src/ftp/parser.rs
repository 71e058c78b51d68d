//! Directory listing parsers for LIST, MLSD and NLST bodies.
//!
//! Three LIST dialects are recognised line by line:
//! 1. **MLSD facts** (RFC 3659): `type=file;size=1234;modify=20260101120000; file.txt`
//! 2. **Unix** (`ls -l`): `-rwxr-xr-x 1 owner group 1234 Jan  1 12:00 file.txt`
//! 3. **Windows/IIS**: `01-01-26  12:00AM       1234 file.txt`
//!
//! A line matching none of them becomes an `Unknown` entry named after the
//! whole line, so nothing the server sent is silently dropped.

use crate::ftp::reply::parse_ftp_time;
use crate::ftp::types::{FtpEntry, FtpEntryKind};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref UNIX_LINE: Regex = Regex::new(
        r"(?x)
        ^([dlcbps-][rwxsStT-]{9})[+@.]?\s+   # mode, optional ACL marker
        (\d+)\s+                              # link count
        (\S+)\s+                              # owner
        (\S+)\s+                              # group
        (\d+)\s+                              # size
        (\w{3})\s+(\d{1,2})\s+([\d:]+)\s+     # month, day, time-or-year
        (.+)$                                 # name (maybe `-> target`)
        "
    )
    .unwrap();
    static ref WINDOWS_LINE: Regex = Regex::new(
        r"(?xi)
        ^(\d{2}-\d{2}-\d{2,4})\s+           # date
        (\d{1,2}:\d{2}\s*(?:AM|PM)?)\s+     # time
        (<DIR>|\d+)\s+                      # size or <DIR>
        (.+)$                               # name
        "
    )
    .unwrap();
}

/// Parse a full LIST or MLSD body.
pub fn parse_listing(raw: &str) -> Vec<FtpEntry> {
    raw.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty() && !is_total_line(l))
        .map(parse_entry)
        .filter(|e| e.name != "." && e.name != "..")
        .collect()
}

/// Parse an NLST body: one name per line. Some servers prefix each name
/// with the listed directory, which is stripped.
pub fn parse_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.rsplit('/').next().unwrap_or(l).to_string())
        .filter(|n| !n.is_empty() && n != "." && n != "..")
        .collect()
}

/// Parse one listing line, falling back to an `Unknown` entry.
pub fn parse_entry(line: &str) -> FtpEntry {
    let line = line.trim_end_matches(['\r', '\n']);
    if looks_like_mlsd(line) {
        if let Some(e) = parse_mlsd(line) {
            return e;
        }
    }
    parse_unix(line)
        .or_else(|| parse_windows(line))
        .unwrap_or_else(|| FtpEntry::named(line.trim(), FtpEntryKind::Unknown))
}

fn is_total_line(line: &str) -> bool {
    let mut words = line.split_whitespace();
    matches!(
        (words.next(), words.next(), words.next()),
        (Some("total"), Some(n), None) if n.chars().all(|c| c.is_ascii_digit())
    )
}

fn looks_like_mlsd(line: &str) -> bool {
    match line.find(' ') {
        Some(pos) => {
            let facts = &line[..pos];
            facts.contains('=') && facts.ends_with(';')
        }
        None => false,
    }
}

// ─── MLSD ────────────────────────────────────────────────────────────

/// `fact1=val1;fact2=val2; name`. The name starts after the first space
/// and may itself contain spaces or `;`.
fn parse_mlsd(line: &str) -> Option<FtpEntry> {
    let (facts_str, name) = line.split_once(' ')?;
    if name.is_empty() {
        return None;
    }

    let facts: HashMap<String, String> = facts_str
        .split(';')
        .filter_map(|f| f.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.to_string()))
        .collect();

    let kind = match facts.get("type").map(|t| t.to_ascii_lowercase()).as_deref() {
        Some("dir") | Some("cdir") | Some("pdir") => FtpEntryKind::Directory,
        Some("file") => FtpEntryKind::File,
        Some(t) if t.ends_with("symlink") || t.ends_with("slink") => FtpEntryKind::Symlink,
        _ => FtpEntryKind::Unknown,
    };

    let mut entry = FtpEntry::named(name, kind);
    entry.size = facts
        .get("size")
        .or_else(|| facts.get("sizd"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.modified = facts.get("modify").and_then(|v| parse_ftp_time(v));
    entry.permissions = facts.get("unix.mode").or_else(|| facts.get("perm")).cloned();
    entry.owner = facts
        .get("unix.owner")
        .or_else(|| facts.get("unix.uid"))
        .cloned();
    entry.group = facts
        .get("unix.group")
        .or_else(|| facts.get("unix.gid"))
        .cloned();
    entry.facts = facts;
    Some(entry)
}

// ─── Unix ────────────────────────────────────────────────────────────

fn parse_unix(line: &str) -> Option<FtpEntry> {
    let caps = UNIX_LINE.captures(line)?;

    let perms = &caps[1];
    let kind = match perms.as_bytes()[0] {
        b'd' => FtpEntryKind::Directory,
        b'l' => FtpEntryKind::Symlink,
        b'-' => FtpEntryKind::File,
        _ => FtpEntryKind::Unknown,
    };

    let raw_name = &caps[9];
    let (name, link_target) = match raw_name.split_once(" -> ") {
        Some((name, target)) if kind == FtpEntryKind::Symlink => (name, Some(target.to_string())),
        _ => (raw_name, None),
    };

    let mut entry = FtpEntry::named(name, kind);
    entry.size = caps[5].parse().unwrap_or(0);
    entry.modified = parse_unix_date(&caps[6], &caps[7], &caps[8], Utc::now());
    entry.permissions = Some(perms.to_string());
    entry.owner = Some(caps[3].to_string());
    entry.group = Some(caps[4].to_string());
    entry.link_target = link_target;
    Some(entry)
}

/// `ls -l` shows `Jan  1 12:00` for recent files and `Jan  1  2025`
/// otherwise. A recent-style date that would land more than a day in the
/// future, or that does not exist this year, belongs to the previous year.
fn parse_unix_date(month: &str, day: &str, time_or_year: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let day: u32 = day.parse().ok()?;
    let month = month_number(month)?;

    if let Some((h, m)) = time_or_year.split_once(':') {
        let (h, m): (u32, u32) = (h.parse().ok()?, m.parse().ok()?);
        let at = |year: i32| {
            NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|d| d.and_hms_opt(h, m, 0))
                .map(|dt| Utc.from_utc_datetime(&dt))
        };
        // `Feb 29` has no date this year when this year is not a leap year.
        match at(now.year()) {
            Some(this_year) if this_year <= now + Duration::days(1) => Some(this_year),
            _ => at(now.year() - 1),
        }
    } else {
        let year: i32 = time_or_year.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| Utc.from_utc_datetime(&dt))
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_ascii_lowercase();
    MONTHS.iter().position(|m| *m == lower).map(|i| i as u32 + 1)
}

// ─── Windows / IIS ───────────────────────────────────────────────────

fn parse_windows(line: &str) -> Option<FtpEntry> {
    let caps = WINDOWS_LINE.captures(line)?;

    let (kind, size) = if caps[3].eq_ignore_ascii_case("<DIR>") {
        (FtpEntryKind::Directory, 0)
    } else {
        (FtpEntryKind::File, caps[3].parse().unwrap_or(0))
    };

    let mut entry = FtpEntry::named(&caps[4], kind);
    entry.size = size;
    entry.modified = parse_windows_date(&caps[1], &caps[2]);
    Some(entry)
}

fn parse_windows_date(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let time: String = time.chars().filter(|c| !c.is_whitespace()).collect();
    let combined = format!("{} {}", date, time.to_ascii_uppercase());
    ["%m-%d-%y %I:%M%p", "%m-%d-%Y %I:%M%p", "%m-%d-%y %H:%M", "%m-%d-%Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
        .map(|dt| Utc.from_utc_datetime(&dt))
}

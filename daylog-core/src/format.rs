use std::{io::Write, ops::Range};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::level::Severity;

/// Timestamp layout of every line, millisecond precision.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Source location of the call that produced a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller<'a> {
    pub file: &'a str,
    pub line: u32,
}

impl Caller<'static> {
    #[track_caller]
    pub fn here() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

/// Last segment of `path`, scanning backward for a separator.
pub fn short_file(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Formats one line into `buf`:
/// `[YYYY-MM-DD HH:MM:SS.mmm][LEVEL][name][file:line] message`.
///
/// `buf` is emptied first and its allocation reused. The message is written
/// as is, callers terminate it with a newline. Returns the byte range of the
/// level tag inside `buf`.
pub fn format_line<Tz: TimeZone>(
    buf: &mut Vec<u8>,
    now: &DateTime<Tz>,
    level: Severity,
    name: &str,
    caller: Option<Caller<'_>>,
    message: &str,
) -> Range<usize>
where
    Tz::Offset: std::fmt::Display,
{
    buf.clear();
    // Writes into a Vec cannot fail.
    let _ = write!(buf, "[{}]", now.format(TIMESTAMP_FORMAT));
    let tag_start = buf.len();
    buf.extend_from_slice(level.tag().as_bytes());
    let tag = tag_start..buf.len();
    buf.push(b'[');
    buf.extend_from_slice(name.as_bytes());
    buf.push(b']');
    if let Some(Caller { file, line }) = caller {
        let _ = write!(buf, "[{}:{}]", short_file(file), line);
    }
    buf.push(b' ');
    buf.extend_from_slice(message.as_bytes());
    tag
}

/// A formatted line read back into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub timestamp: NaiveDateTime,
    pub level: Severity,
    pub name: String,
    pub caller: Option<(String, u32)>,
    pub message: String,
}

impl ParsedLine {
    /// Parses the first line of `text`. The message keeps everything after the
    /// header, trailing newline and traceback included.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('[')?;
        let (timestamp, rest) = rest.split_once(']')?;
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
        let tag_end = rest.find(']')? + 1;
        let level = Severity::from_tag(&rest[..tag_end])?;
        let rest = rest[tag_end..].strip_prefix('[')?;
        let (name, mut rest) = rest.split_once(']')?;
        let mut caller = None;
        if let Some(inner) = rest.strip_prefix('[') {
            let (location, after) = inner.split_once(']')?;
            let (file, line) = location.rsplit_once(':')?;
            caller = Some((file.to_string(), line.parse().ok()?));
            rest = after;
        }
        let message = rest.strip_prefix(' ')?;
        Some(Self {
            timestamp,
            level,
            name: name.to_string(),
            caller,
            message: message.to_string(),
        })
    }
}

/// Local wall clock, the time source of all lines.
pub fn now() -> DateTime<Local> {
    Local::now()
}

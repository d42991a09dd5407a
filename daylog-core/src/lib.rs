//! # daylog-core
//! Core utilities for daylog - line formatting, sinks and day-stamped log files.

mod config;
mod format;
mod level;
mod log_rotation;
mod log_writer;
mod trace;

pub use config::{DAYLOG_DEFAULTS, Defaults, host_name};
pub use format::{Caller, ParsedLine, TIMESTAMP_FORMAT, format_line, now, short_file};
pub use level::{ParseSeverityError, Severity};
pub use log_rotation::{DAY_FORMAT, DailyFile, FileTarget};
pub use log_writer::{Console, LogFile, SharedBuffer, ensure_dir, stderr, write_console};
pub use trace::traceback;

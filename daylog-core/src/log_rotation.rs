use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeZone};

use crate::log_writer::{LogFile, ensure_dir};

/// Day component of log file names.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Where a logger's files live and how they are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub dir: PathBuf,
    pub host: String,
    pub service: String,
}

impl FileTarget {
    /// `<host>.<service>.<day>.log`, or `<host>.<day>.log` without a service name.
    pub fn file_name(&self, day: &str) -> String {
        if self.service.is_empty() {
            format!("{}.{day}.log", self.host)
        } else {
            format!("{}.{}.{day}.log", self.host, self.service)
        }
    }

    pub fn path(&self, day: &str) -> PathBuf {
        self.dir.join(self.file_name(day))
    }
}

fn day_of<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format(DAY_FORMAT).to_string()
}

/// A log file that moves to a new day-stamped name when the date changes.
#[derive(Debug)]
pub struct DailyFile {
    target: FileTarget,
    day: String,
    file: LogFile,
}

impl DailyFile {
    /// Creates the directory if needed and opens the file for `now`'s day.
    pub fn open<Tz: TimeZone>(target: FileTarget, now: &DateTime<Tz>) -> io::Result<Self>
    where
        Tz::Offset: std::fmt::Display,
    {
        ensure_dir(&target.dir)?;
        let day = day_of(now);
        let file = LogFile::open(target.path(&day))?;
        Ok(Self { target, day, file })
    }

    pub fn target(&self) -> &FileTarget {
        &self.target
    }

    pub fn day(&self) -> &str {
        &self.day
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Appends `bytes`, first switching to the file of `now`'s day if the
    /// date moved forward. A failed switch keeps writing to the current file.
    pub fn write<Tz: TimeZone>(&mut self, now: &DateTime<Tz>, bytes: &[u8]) -> io::Result<()>
    where
        Tz::Offset: std::fmt::Display,
    {
        let day = day_of(now);
        // Days are zero-padded, string order is date order.
        if day > self.day {
            let reopened = ensure_dir(&self.target.dir)
                .and_then(|_| LogFile::open(self.target.path(&day)));
            if let Ok(file) = reopened {
                self.file = file;
                self.day = day;
            }
        }
        self.file.write_all(bytes)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::fs;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("daylog_test_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn day(d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc()
    }

    fn target(dir: &Path, service: &str) -> FileTarget {
        FileTarget {
            dir: dir.to_path_buf(),
            host: "host".into(),
            service: service.into(),
        }
    }

    #[test]
    fn test_file_names() {
        let dir = PathBuf::from("/var/log/app");
        assert_eq!(
            target(&dir, "billing").file_name("2024-01-01"),
            "host.billing.2024-01-01.log"
        );
        assert_eq!(target(&dir, "").file_name("2024-01-01"), "host.2024-01-01.log");
        assert_eq!(
            target(&dir, "").path("2024-01-01"),
            PathBuf::from("/var/log/app/host.2024-01-01.log")
        );
    }

    #[test]
    fn test_daily_file_rotates_on_day_change() {
        let dir = test_dir("daily_rotation");
        let mut file = DailyFile::open(target(&dir, "svc"), &day(1)).unwrap();
        assert_eq!(file.day(), "2024-01-01");
        file.write(&day(1), b"monday\n").unwrap();
        file.write(&day(1), b"still monday\n").unwrap();
        file.write(&day(2), b"tuesday\n").unwrap();
        file.flush().unwrap();
        assert_eq!(file.day(), "2024-01-02");
        assert_eq!(file.path(), dir.join("host.svc.2024-01-02.log"));
        assert_eq!(
            fs::read_to_string(dir.join("host.svc.2024-01-01.log")).unwrap(),
            "monday\nstill monday\n"
        );
        assert_eq!(
            fs::read_to_string(dir.join("host.svc.2024-01-02.log")).unwrap(),
            "tuesday\n"
        );
    }

    #[test]
    fn test_daily_file_never_rotates_backward() {
        let dir = test_dir("daily_backward");
        let mut file = DailyFile::open(target(&dir, ""), &day(4)).unwrap();
        file.write(&day(5), b"new day\n").unwrap();
        file.write(&day(4), b"late writer\n").unwrap();
        assert_eq!(file.day(), "2024-01-05");
        assert_eq!(
            fs::read_to_string(dir.join("host.2024-01-05.log")).unwrap(),
            "new day\nlate writer\n"
        );
        assert_eq!(
            fs::read_to_string(dir.join("host.2024-01-04.log")).unwrap(),
            ""
        );
    }

    #[test]
    fn test_daily_file_replaces_file_at_dir_path() {
        let dir = test_dir("daily_dir_is_file");
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        fs::write(&dir, "in the way").unwrap();
        let mut file = DailyFile::open(target(&dir, ""), &day(3)).unwrap();
        file.write(&day(3), b"ok\n").unwrap();
        assert!(dir.is_dir());
        assert_eq!(
            fs::read_to_string(dir.join("host.2024-01-03.log")).unwrap(),
            "ok\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }
}

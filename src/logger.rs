use std::{
    collections::HashMap,
    fmt::Display,
    io::Write,
    path::PathBuf,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
};

use daylog_core::{
    Caller, Console, DailyFile, Defaults, FileTarget, Severity, format_line, now, stderr,
    traceback, write_console,
};

use crate::utils::lock;

pub(crate) type LoggerMap = Mutex<HashMap<String, Arc<Logger>>>;

/// Mutable part of a logger, guarded by its own lock.
struct Output {
    buf: Vec<u8>,
    file: Option<DailyFile>,
    console: Console,
    /// Set by `close`, a closed logger never opens a file again.
    closed: bool,
}

/// A named logger writing to the console and to a day-stamped file.
///
/// The file receives every line. The console only receives lines at or above
/// the logger's level. Each logger serializes its own writes, unrelated
/// loggers never wait on each other.
pub struct Logger {
    name: String,
    level: AtomicU8,
    show_file: AtomicBool,
    color: AtomicBool,
    target: Option<FileTarget>,
    output: Mutex<Output>,
    registry: Weak<LoggerMap>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("show_file", &self.show_file())
            .field("file", &self.file_path())
            .finish()
    }
}

impl Logger {
    pub(crate) fn new(name: &str, defaults: &Defaults, registry: Weak<LoggerMap>) -> Self {
        let target = defaults.dir.clone().map(|dir| FileTarget {
            dir,
            host: defaults.host_name.clone(),
            service: defaults.service_name.clone(),
        });
        let file = target
            .clone()
            .and_then(|target| DailyFile::open(target, &now()).ok());
        Self {
            name: name.to_string(),
            level: AtomicU8::new(defaults.level.as_u8()),
            show_file: AtomicBool::new(defaults.show_file),
            color: AtomicBool::new(defaults.color),
            target,
            output: Mutex::new(Output {
                buf: Vec::with_capacity(256),
                file,
                console: stderr(),
                closed: false,
            }),
            registry,
        }
    }

    /// A logger that belongs to no registry.
    pub fn detached(name: &str, defaults: &Defaults) -> Self {
        Self::new(name, defaults, Weak::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Severity {
        Severity::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Sets the minimum severity written to the console.
    pub fn set_level(&self, level: Severity) -> &Self {
        self.level.store(level.as_u8(), Ordering::Relaxed);
        self
    }

    pub fn show_file(&self) -> bool {
        self.show_file.load(Ordering::Relaxed)
    }

    /// Toggles the `[file:line]` segment, effective from the next line.
    pub fn set_show_file(&self, show: bool) -> &Self {
        self.show_file.store(show, Ordering::Relaxed);
        self
    }

    /// Toggles coloring of the level tag on the console. Files are never colored.
    pub fn set_color(&self, color: bool) -> &Self {
        self.color.store(color, Ordering::Relaxed);
        self
    }

    /// Replaces the console sink.
    pub fn with_console<W: Write + Send + 'static>(&self, console: W) -> &Self {
        lock(&self.output).console = Box::new(console);
        self
    }

    pub fn has_file(&self) -> bool {
        lock(&self.output).file.is_some()
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        lock(&self.output)
            .file
            .as_ref()
            .map(|file| file.path().to_path_buf())
    }

    /// Closes the current file and opens the day-stamped file of `service_name`
    /// in the same directory. On failure the logger keeps only the console.
    /// Does nothing once the logger is closed.
    pub fn set_service_name(&self, service_name: &str) {
        let mut output = lock(&self.output);
        if output.closed {
            return;
        }
        if let Some(mut file) = output.file.take() {
            let _ = file.flush();
        }
        output.file = self.target.clone().and_then(|target| {
            let target = FileTarget {
                service: service_name.to_string(),
                ..target
            };
            DailyFile::open(target, &now()).ok()
        });
    }

    /// Formats and writes one line. `message` is written verbatim.
    #[track_caller]
    pub fn output(&self, level: Severity, message: &str) {
        let caller = if self.show_file() {
            Some(Caller::here())
        } else {
            None
        };
        self.write_line(level, caller, message);
    }

    pub(crate) fn write_line(&self, level: Severity, caller: Option<Caller<'_>>, message: &str) {
        let color = self.color.load(Ordering::Relaxed);
        let mut output = lock(&self.output);
        // Taken under the lock so lines are written in timestamp order.
        let now = now();
        let Output {
            buf, file, console, ..
        } = &mut *output;
        let tag = format_line(buf, &now, level, &self.name, caller, message);
        if let Some(file) = file {
            let _ = file.write(&now, buf);
        }
        if self.level() <= level {
            let _ = write_console(console.as_mut(), buf, tag, level, color);
        }
    }

    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        self.output(Severity::Debug, &format!("{message}\n"));
    }

    #[track_caller]
    pub fn info(&self, message: impl Display) {
        self.output(Severity::Info, &format!("{message}\n"));
    }

    /// Same as `info`.
    #[track_caller]
    pub fn println(&self, message: impl Display) {
        self.output(Severity::Info, &format!("{message}\n"));
    }

    #[track_caller]
    pub fn warning(&self, message: impl Display) {
        self.output(Severity::Warning, &format!("{message}\n"));
    }

    #[track_caller]
    pub fn warn(&self, message: impl Display) {
        self.output(Severity::Warning, &format!("{message}\n"));
    }

    /// Writes `message` followed by a traceback of the call site.
    #[track_caller]
    pub fn error(&self, message: impl Display) {
        let caller = Caller::here();
        let text = traceback(&format!("{message}\n"), Some(caller));
        self.write_line(Severity::Error, self.show_file().then_some(caller), &text);
    }

    /// Writes `message` with a traceback, flushes, and exits the process with status 1.
    #[track_caller]
    pub fn fatal(&self, message: impl Display) -> ! {
        let caller = Caller::here();
        let text = traceback(&format!("{message}\n"), Some(caller));
        self.write_line(Severity::Fatal, self.show_file().then_some(caller), &text);
        self.flush();
        std::process::exit(1)
    }

    pub fn flush(&self) {
        let mut output = lock(&self.output);
        if let Some(file) = output.file.as_mut() {
            let _ = file.flush();
        }
        let _ = output.console.flush();
    }

    /// Closes the file and drops the logger from its registry. Later lines
    /// still reach the console. Closing twice is a no-op.
    pub fn close(&self) {
        self.release();
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut loggers = lock(&registry);
        // The name may already belong to a newer logger.
        if loggers
            .get(&self.name)
            .is_some_and(|logger| std::ptr::eq(Arc::as_ptr(logger), self))
        {
            loggers.remove(&self.name);
        }
    }

    pub(crate) fn release(&self) {
        let mut output = lock(&self.output);
        if let Some(mut file) = output.file.take() {
            let _ = file.flush();
        }
        output.buf.clear();
        output.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daylog_core::{ParsedLine, SharedBuffer};
    use std::{fs, process::Command};

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("daylog_test_logger_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn defaults(name: &str, level: Severity) -> Defaults {
        Defaults {
            level,
            dir: Some(test_dir(name)),
            host_name: "host".into(),
            service_name: String::new(),
            show_file: false,
            color: false,
        }
    }

    fn captured(logger: &Logger) -> SharedBuffer {
        let console = SharedBuffer::new();
        logger.with_console(console.clone());
        console
    }

    fn file_content(logger: &Logger) -> String {
        fs::read_to_string(logger.file_path().unwrap()).unwrap()
    }

    #[test]
    fn test_info_reaches_file_and_console() {
        let logger = Logger::detached("svcA", &defaults("info", Severity::Info));
        let console = captured(&logger);
        logger.info("hello");
        let line = console.contents();
        assert!(line.contains("[INFO][svcA] "));
        assert!(line.ends_with("hello\n"));
        assert_eq!(file_content(&logger), line);
        let parsed = ParsedLine::parse(&line).unwrap();
        assert_eq!(parsed.level, Severity::Info);
        assert_eq!(parsed.name, "svcA");
        assert_eq!(parsed.message, "hello\n");
    }

    #[test]
    fn test_below_threshold_only_reaches_file() {
        let logger = Logger::detached("svcB", &defaults("threshold", Severity::Error));
        let console = captured(&logger);
        logger.debug("skip me");
        assert!(console.contents().is_empty());
        assert!(file_content(&logger).ends_with("[DEBUG][svcB] skip me\n"));
    }

    #[test]
    fn test_console_iff_level_at_least_threshold() {
        let logger = Logger::detached("grid", &defaults("grid", Severity::Debug));
        let console = captured(&logger);
        let mut expected_file_lines = 0;
        for threshold in Severity::ALL {
            logger.set_level(threshold);
            for level in [Severity::Debug, Severity::Info, Severity::Warning] {
                console.clear();
                logger.output(level, "m\n");
                expected_file_lines += 1;
                assert_eq!(!console.contents().is_empty(), level >= threshold);
            }
        }
        assert_eq!(file_content(&logger).lines().count(), expected_file_lines);
    }

    #[test]
    fn test_set_level_only_affects_later_lines() {
        let logger = Logger::detached("lvl", &defaults("set_level", Severity::Info));
        let console = captured(&logger);
        logger.debug("first");
        assert_eq!(logger.set_level(Severity::Debug).level(), Severity::Debug);
        logger.debug("second");
        let out = console.contents();
        assert!(!out.contains("first"));
        assert!(out.contains("second"));
        assert_eq!(file_content(&logger).lines().count(), 2);
    }

    #[test]
    fn test_show_file() {
        let logger = Logger::detached("caller", &defaults("show_file", Severity::Debug));
        let console = captured(&logger);
        logger.set_show_file(true).info("here");
        let line = line!() - 1;
        logger.set_show_file(false).info("there");
        let out = console.contents();
        let mut lines = out.lines();
        assert!(
            lines
                .next()
                .unwrap()
                .contains(&format!("[caller][logger.rs:{line}] here"))
        );
        assert!(lines.next().unwrap().contains("[caller] there"));
    }

    #[test]
    fn test_error_appends_traceback() {
        let logger = Logger::detached("err", &defaults("error", Severity::Info));
        let console = captured(&logger);
        logger.error("boom");
        let out = console.contents();
        assert!(out.contains("[ERROR][err] boom\nTraceback:"));
        assert!(out.lines().count() >= 2);
        assert_eq!(file_content(&logger), out);
    }

    #[test]
    fn test_close_is_idempotent() {
        let logger = Logger::detached("closing", &defaults("close", Severity::Info));
        let console = captured(&logger);
        assert!(logger.has_file());
        logger.close();
        logger.close();
        assert!(!logger.has_file());
        logger.info("console only");
        assert!(console.contents().contains("console only"));
    }

    #[test]
    fn test_unopenable_dir_falls_back_to_console() {
        let dir = test_dir("blocked");
        fs::create_dir_all(dir.parent().unwrap()).unwrap();
        fs::write(&dir, "file").unwrap();
        let mut config = defaults("blocked_unused", Severity::Info);
        // A directory can never be created below a regular file.
        config.dir = Some(dir.join("sub"));
        let logger = Logger::detached("nofile", &config);
        let console = captured(&logger);
        assert!(!logger.has_file());
        logger.info("still works");
        assert!(console.contents().ends_with("still works\n"));
        fs::remove_file(&dir).unwrap();

        let mut config = defaults("no_dir", Severity::Info);
        config.dir = None;
        assert!(!Logger::detached("nodir", &config).has_file());
    }

    #[test]
    fn test_set_service_name_reopens_file() {
        let config = defaults("service", Severity::Info);
        let logger = Logger::detached("svc", &config);
        let before = logger.file_path().unwrap();
        logger.info("before");
        logger.set_service_name("billing");
        let after = logger.file_path().unwrap();
        logger.info("after");
        assert_ne!(before, after);
        assert_eq!(after.parent(), before.parent());
        let name = after.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("host.billing."));
        assert!(fs::read_to_string(before).unwrap().contains("before"));
        assert!(!file_content(&logger).contains("before"));
        assert!(file_content(&logger).contains("after"));
    }

    #[test]
    fn test_concurrent_lines_do_not_interleave() {
        let logger = Arc::new(Logger::detached(
            "mt",
            &defaults("concurrent", Severity::Info),
        ));
        let console = captured(&logger);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for j in 0..50 {
                        logger.info(format!("thread {i} line {j}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for out in [console.contents(), file_content(&logger)] {
            assert_eq!(out.lines().count(), 400);
            for line in out.lines() {
                let parsed = ParsedLine::parse(line).unwrap();
                assert_eq!(parsed.name, "mt");
                assert!(parsed.message.starts_with("thread "));
            }
        }
    }

    #[test]
    fn test_timestamps_never_go_backward() {
        let logger = Arc::new(Logger::detached(
            "ordered",
            &defaults("ordered", Severity::Info),
        ));
        let console = captured(&logger);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let logger = Arc::clone(&logger);
                std::thread::spawn(move || {
                    for j in 0..2000 {
                        logger.info(format_args!("{i}-{j}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for out in [console.contents(), file_content(&logger)] {
            let stamps: Vec<_> = out
                .lines()
                .map(|line| ParsedLine::parse(line).unwrap().timestamp)
                .collect();
            assert_eq!(stamps.len(), 16000);
            assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_closed_logger_does_not_reopen_file() {
        let config = defaults("closed_service", Severity::Info);
        let logger = Logger::detached("gone", &config);
        logger.close();
        logger.set_service_name("billing");
        assert!(!logger.has_file());
        let dir = config.dir.unwrap();
        assert!(
            fs::read_dir(dir)
                .unwrap()
                .flatten()
                .all(|entry| !entry.file_name().to_string_lossy().contains("billing"))
        );
    }

    #[test]
    fn test_fatal_exits_process() {
        if std::env::var_os("DAYLOG_FATAL_CHILD").is_some() {
            let logger = Logger::detached("dying", &defaults("fatal", Severity::Info));
            logger.fatal("dying");
        }
        let output = Command::new(std::env::current_exe().unwrap())
            .args(["--exact", "logger::tests::test_fatal_exits_process", "--nocapture"])
            .env("DAYLOG_FATAL_CHILD", "1")
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("[FATAL][dying] dying\nTraceback:"));
        let dir = std::env::temp_dir().join("daylog_test_logger_fatal");
        let logged: String = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|entry| fs::read_to_string(entry.path()).unwrap())
            .collect();
        assert!(logged.contains("[FATAL][dying] dying\n"));
    }
}

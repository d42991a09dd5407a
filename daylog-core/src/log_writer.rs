use std::{
    fs::{self, File},
    io::{self, Write},
    ops::Range,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use colored::{ColoredString, Colorize};

use crate::level::Severity;

/// Console sink of a logger.
pub type Console = Box<dyn Write + Send>;

/// The default console sink.
pub fn stderr() -> Console {
    Box::new(io::stderr())
}

/// Creates `dir` and its parents. A non-directory already sitting at `dir`
/// is removed first.
pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    if let Ok(meta) = fs::metadata(dir)
        && !meta.is_dir()
    {
        fs::remove_file(dir)?;
    }
    fs::create_dir_all(dir)
}

/// A log file opened for appending.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: File,
}

impl LogFile {
    /// Opens `path` for appending, creating it if needed. An empty directory
    /// occupying `path` is replaced by the file.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        if fs::metadata(path).is_ok_and(|meta| meta.is_dir()) {
            fs::remove_dir(path)?;
        }
        let file = File::options().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}

fn colored_tag(level: Severity) -> ColoredString {
    let tag = level.tag();
    match level {
        Severity::Fatal => tag.red().bold(),
        Severity::Error => tag.red(),
        Severity::Warning => tag.yellow(),
        Severity::Info => tag.green(),
        Severity::Debug => tag.blue(),
    }
}

/// Writes a formatted line to the console, optionally coloring the level tag
/// found at `tag` inside `line`.
pub fn write_console(
    console: &mut dyn Write,
    line: &[u8],
    tag: Range<usize>,
    level: Severity,
    color: bool,
) -> io::Result<()> {
    if color && tag.end <= line.len() {
        console.write_all(&line[..tag.start])?;
        write!(console, "{}", colored_tag(level))?;
        console.write_all(&line[tag.end..])?;
    } else {
        console.write_all(line)?;
    }
    console.flush()
}

/// In-memory console that can be cloned and read back, for capturing output.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

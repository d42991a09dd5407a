use std::sync::Arc;

use daylog_core::{Caller, Severity, traceback};
use log::{LevelFilter, Log, SetLoggerError};

use crate::logger::Logger;

/// Routes `log` records to a daylog logger.
struct DaylogBridge(Arc<Logger>);

impl Log for DaylogBridge {
    fn enabled(&self, _: &log::Metadata) -> bool {
        // The file takes every level, the console threshold is applied per line.
        true
    }

    fn log(&self, record: &log::Record) {
        let logger = &self.0;
        let level = Severity::from(record.level());
        let location = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(Caller { file, line }),
            _ => None,
        };
        let caller = location.filter(|_| logger.show_file());
        let message = format!("{}\n", record.args());
        if level >= Severity::Error {
            logger.write_line(level, caller, &traceback(&message, location));
        } else {
            logger.write_line(level, caller, &message);
        }
    }

    fn flush(&self) {
        self.0.flush();
    }
}

/// Installs `logger` as the backend of the `log` macros.
///
/// Fails if another `log` backend is already installed.
pub fn init_log(logger: Arc<Logger>) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(DaylogBridge(logger)))?;
    log::set_max_level(LevelFilter::Trace);
    Ok(())
}

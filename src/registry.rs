use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use daylog_core::{DAYLOG_DEFAULTS, Defaults, Severity};

use crate::{
    logger::{Logger, LoggerMap},
    utils::lock,
};

/// Name to logger mapping plus the defaults new loggers start from.
///
/// Changing a default never touches existing loggers: each one keeps the
/// level, flags and file it was created with.
pub struct Registry {
    loggers: Arc<LoggerMap>,
    defaults: RwLock<Defaults>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DAYLOG_DEFAULTS.clone())
    }
}

impl Registry {
    pub fn new(defaults: Defaults) -> Self {
        Self {
            loggers: Arc::new(Mutex::new(HashMap::new())),
            defaults: RwLock::new(defaults),
        }
    }

    fn read_defaults(&self) -> RwLockReadGuard<'_, Defaults> {
        self.defaults.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_defaults(&self) -> RwLockWriteGuard<'_, Defaults> {
        self.defaults.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the logger registered under `name`, creating it from the
    /// current defaults on first use.
    pub fn logger(&self, name: &str) -> Arc<Logger> {
        let mut loggers = lock(&self.loggers);
        if let Some(logger) = loggers.get(name) {
            return Arc::clone(logger);
        }
        let defaults = self.read_defaults().clone();
        let logger = Arc::new(Logger::new(name, &defaults, Arc::downgrade(&self.loggers)));
        loggers.insert(name.to_string(), Arc::clone(&logger));
        logger
    }

    pub fn contains(&self, name: &str) -> bool {
        lock(&self.loggers).contains_key(name)
    }

    pub fn len(&self) -> usize {
        lock(&self.loggers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every logger and empties the registry in one step.
    pub fn close_all(&self) {
        let mut loggers = lock(&self.loggers);
        for (_, logger) in loggers.drain() {
            logger.release();
        }
    }

    pub fn defaults(&self) -> Defaults {
        self.read_defaults().clone()
    }

    pub fn set_default_level(&self, level: Severity) {
        self.write_defaults().level = level;
    }

    /// Directory for loggers created from now on. `None` disables their files.
    pub fn set_default_dir(&self, dir: Option<PathBuf>) {
        self.write_defaults().dir = dir;
    }

    pub fn set_show_file(&self, show: bool) {
        self.write_defaults().show_file = show;
    }

    pub fn set_service_name(&self, service_name: &str) {
        self.write_defaults().service_name = service_name.to_string();
    }

    pub fn set_color(&self, color: bool) {
        self.write_defaults().color = color;
    }
}

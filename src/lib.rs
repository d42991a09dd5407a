//! # daylog
//! Named, leveled loggers writing to stderr and to day-stamped log files.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! daylog = "0.1.0"
//! ```
//!
//! ```rust
//! use daylog::Severity;
//!
//! daylog::set_dir(std::env::temp_dir().join("daylog_doc_usage"));
//! let logger = daylog::new("api");
//! logger.set_level(Severity::Warning);
//! logger.info("only in the file");
//! logger.warning("in the file and on stderr");
//! assert!(std::sync::Arc::ptr_eq(&logger, &daylog::new("api")));
//! logger.close();
//! ```
//!
//! Every line looks like
//! `[2024-01-02 03:04:05.678][WARNING][api][main.rs:7] in the file and on stderr`.
//! The `[file:line]` part is present when `show_file` is on.
//!
//! ## Log files
//! Files live in the configured directory and are named
//! `<host>.<service>.<YYYY-MM-DD>.log` (`<host>.<YYYY-MM-DD>.log` without a
//! service name). A logger moves to the next file when the date changes.
//! Files are opened in append mode and receive every level. If the directory
//! or file cannot be opened the logger silently writes to stderr only.
//!
//! ## Configuration
//! Defaults come from `DAYLOG_LEVEL`, `DAYLOG_DIR`, `DAYLOG_SHOW_FILE`,
//! `DAYLOG_SERVICE_NAME`, `DAYLOG_HOST_NAME` and `DAYLOG_COLOR`, and can be
//! changed with the setters below. A logger keeps the settings it was created
//! with; new defaults only apply to loggers created afterwards.
//!
//! ## The `log` crate
//! ```rust
//! daylog::set_dir(std::env::temp_dir().join("daylog_doc_log"));
//! let logger = daylog::new("app");
//! logger.set_show_file(false);
//! daylog::init_log(logger).expect("a log backend is already installed");
//! log::info!("Hello, world!");
//! ```

mod log_bridge;
mod logger;
mod registry;
mod utils;

pub use daylog_core::{
    Caller, Defaults, FileTarget, ParseSeverityError, ParsedLine, Severity, SharedBuffer,
};
pub use log_bridge::init_log;
pub use logger::Logger;
pub use registry::Registry;

use std::{
    fmt::Display,
    path::PathBuf,
    sync::{Arc, LazyLock},
};

/// Name of the logger behind the free logging functions.
pub const DEFAULT_LOGGER: &str = "std";

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::default);

/// The process-wide registry behind the free functions.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Returns the logger named `name`, creating it on first use.
pub fn new(name: &str) -> Arc<Logger> {
    REGISTRY.logger(name)
}

/// Closes every logger of the process-wide registry.
pub fn close_all() {
    REGISTRY.close_all()
}

/// Default console level of new loggers. Default: `Info`.
pub fn set_level(level: Severity) {
    REGISTRY.set_default_level(level)
}

/// Log directory of new loggers. Existing loggers keep their file.
pub fn set_dir<P: Into<PathBuf>>(dir: P) {
    REGISTRY.set_default_dir(Some(dir.into()))
}

pub fn show_file(show: bool) {
    REGISTRY.set_show_file(show)
}

pub fn set_service_name(service_name: &str) {
    REGISTRY.set_service_name(service_name)
}

pub fn default_logger() -> Arc<Logger> {
    REGISTRY.logger(DEFAULT_LOGGER)
}

#[track_caller]
pub fn debug(message: impl Display) {
    default_logger().debug(message)
}

#[track_caller]
pub fn info(message: impl Display) {
    default_logger().info(message)
}

#[track_caller]
pub fn println(message: impl Display) {
    default_logger().println(message)
}

#[track_caller]
pub fn warning(message: impl Display) {
    default_logger().warning(message)
}

#[track_caller]
pub fn error(message: impl Display) {
    default_logger().error(message)
}

#[track_caller]
pub fn fatal(message: impl Display) -> ! {
    default_logger().fatal(message)
}

#[test]
fn test_free_functions_use_default_logger() {
    set_dir(std::env::temp_dir().join("daylog_test_free_functions"));
    let logger = default_logger();
    let console = SharedBuffer::new();
    logger.with_console(console.clone()).set_show_file(true);
    info("via default");
    let line = line!() - 1;
    assert!(
        console
            .contents()
            .contains(&format!("[INFO][std][lib.rs:{line}] via default\n"))
    );
    assert!(registry().contains(DEFAULT_LOGGER));
}

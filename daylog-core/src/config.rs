use std::{path::PathBuf, str::FromStr, sync::LazyLock};

use derive_from_env::FromEnv;

use crate::level::Severity;

#[derive(FromEnv)]
#[from_env(prefix = "DAYLOG")]
#[allow(non_snake_case)]
struct DaylogEnv {
    LEVEL: Option<String>,
    DIR: Option<String>,
    SHOW_FILE: Option<String>,
    SERVICE_NAME: Option<String>,
    HOST_NAME: Option<String>,
    COLOR: Option<String>,
}

/// `value` parsed, or `fallback` when unset or malformed.
fn parsed_or<T: FromStr>(value: Option<String>, fallback: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(fallback)
}

/// Process defaults read once from `DAYLOG_*` environment variables.
pub static DAYLOG_DEFAULTS: LazyLock<Defaults> = LazyLock::new(Defaults::from_env);

/// Settings a logger is created with.
///
/// Loggers keep the copy they were created with, later changes to the
/// registry defaults only reach loggers created afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Minimum severity written to the console.
    pub level: Severity,
    /// Directory holding the day-stamped log files. `None` disables file output.
    pub dir: Option<PathBuf>,
    pub host_name: String,
    pub service_name: String,
    /// Append `[file:line]` of the call site to each line.
    pub show_file: bool,
    /// Color the level tag on the console.
    pub color: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            level: Severity::Info,
            dir: Some(PathBuf::from("./log")),
            host_name: host_name(),
            service_name: String::new(),
            show_file: true,
            color: false,
        }
    }
}

impl Defaults {
    /// Reads `DAYLOG_*` variables. Each unset or malformed variable falls back
    /// to its own default, the others still apply. An empty `DAYLOG_DIR`
    /// disables file output.
    pub fn from_env() -> Self {
        match DaylogEnv::from_env() {
            Ok(env) => Self::resolve(env),
            Err(_) => Self::default(),
        }
    }

    fn resolve(env: DaylogEnv) -> Self {
        let fallback = Self::default();
        Self {
            level: parsed_or(env.LEVEL, fallback.level),
            dir: match env.DIR {
                Some(dir) if dir.trim().is_empty() => None,
                Some(dir) => Some(PathBuf::from(dir)),
                None => fallback.dir,
            },
            host_name: env
                .HOST_NAME
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(fallback.host_name),
            service_name: env.SERVICE_NAME.unwrap_or(fallback.service_name),
            show_file: parsed_or(env.SHOW_FILE, fallback.show_file),
            color: parsed_or(env.COLOR, fallback.color),
        }
    }
}

/// Best effort host name: `$HOSTNAME`, then `/etc/hostname`, then `localhost`.
pub fn host_name() -> String {
    if let Ok(name) = std::env::var("HOSTNAME")
        && !name.trim().is_empty()
    {
        return name.trim().to_string();
    }
    std::fs::read_to_string("/etc/hostname")
        .ok()
        .and_then(|content| content.lines().next().map(|l| l.trim().to_string()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".into())
}

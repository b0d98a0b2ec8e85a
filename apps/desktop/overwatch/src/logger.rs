//! Logging for the OVERWATCH shell.
//!
//! Two dispatches share one format: colored stdout for development and a plain
//! `overwatch.log` in the app log directory. Lines forwarded from the web
//! server arrive with the `server` target and are tagged `[server]` instead of
//! a source position.

use crate::error::OverwatchError;

use server_core::SERVER_LOG_TARGET;

use common::ErrorLocation;

use std::fmt::Display;
use std::fs::File;
use std::io::stdout;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "overwatch.log";

const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Toolkit crates that are noisy at debug level.
const QUIET_TARGETS: [&str; 3] = ["tao", "wry", "tracing"];

/// Initialize the logger with dual output (stdout + file).
///
/// Safe to call more than once: later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns [`OverwatchError::Overwatch`] if the log file cannot be opened or a
/// global logger is already installed by someone else.
pub fn initialize(log_dir: &Path) -> Result<(), OverwatchError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = apply_dispatch(log_dir);
        if result.is_ok() {
            info!("Logger initialized with level {LOG_LEVEL:?} ({LOG_FILE_NAME})");
        }
    });

    result
}

fn apply_dispatch(log_dir: &Path) -> Result<(), OverwatchError> {
    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let mut base_dispatch = Dispatch::new().level(LOG_LEVEL);
    for target in QUIET_TARGETS {
        base_dispatch = base_dispatch.level_for(target, LevelFilter::Warn);
    }

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}",
                render_line(colors.color(record.level()), message, record)
            ))
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                render_line(record.level(), message, record)
            ))
        })
        .chain(open_log_file(log_dir)?);

    base_dispatch
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()
        .map_err(|e| OverwatchError::Overwatch {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::caller(),
        })
}

/// Open (append) `overwatch.log` inside `log_dir`.
#[track_caller]
pub(crate) fn open_log_file(log_dir: &Path) -> Result<File, OverwatchError> {
    let location = ErrorLocation::caller();
    let path = log_dir.join(LOG_FILE_NAME);

    fern::log_file(&path).map_err(|e| OverwatchError::Overwatch {
        message: format!("Failed to create log file {}: {e}", path.display()),
        location,
    })
}

fn render_line(
    level: impl Display,
    message: &std::fmt::Arguments<'_>,
    record: &Record<'_>,
) -> String {
    format!(
        "[{date} - {level}] {message} {origin}",
        date = format_rfc3339(SystemTime::now()),
        origin = origin(record.target(), record.file(), record.line()),
    )
}

/// Trailing tag for a log line: `[server]` for forwarded child output,
/// otherwise `[file:line]`.
pub(crate) fn origin(target: &str, file: Option<&str>, line: Option<u32>) -> String {
    if target == SERVER_LOG_TARGET {
        return format!("[{SERVER_LOG_TARGET}]");
    }

    format!("[{}:{}]", file.unwrap_or("unknown"), line.unwrap_or(0))
}

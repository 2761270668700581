//! Minimal levelled logger used throughout the crate.
//!
//! Messages go to stderr so that command output (log contents, tables) on stdout
//! stays clean. The `log_*!` macros are exported at the crate root and accept the
//! same arguments as `format!`.

use colored::Colorize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

// Set once from the `--debug` flag.
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
// Set by silent auto-clean runs; hides info lines but never warnings or errors.
static QUIET: AtomicBool = AtomicBool::new(false);

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Initializes the logger.
///
/// # Arguments
/// * `debug` - When `true`, `log_debug!` lines are printed as well.
pub fn init(debug: bool) {
    DEBUG_ENABLED.store(debug, Ordering::Relaxed);
}

/// Returns `true` if `--debug` was passed on the command line.
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Suppresses (or restores) info-level output.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Returns `true` if a line at `level` should currently be printed.
pub fn enabled(level: Level) -> bool {
    match level {
        Level::Debug => is_debug_enabled(),
        Level::Info => !QUIET.load(Ordering::Relaxed),
        Level::Warn | Level::Error => true,
    }
}

/// Writes a single log line. Called by the `log_*!` macros; use those instead.
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let tag = match level {
        Level::Debug => "[DEBUG]".dimmed(),
        Level::Info => "[INFO]".bright_cyan(),
        Level::Warn => "[WARN]".bright_yellow(),
        Level::Error => "[ERROR]".bright_red().bold(),
    };
    eprintln!("{} {}", tag, args);
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_never_suppressed() {
        set_quiet(true);
        assert!(!enabled(Level::Info));
        assert!(enabled(Level::Warn));
        assert!(enabled(Level::Error));
        set_quiet(false);
        assert!(enabled(Level::Info));
    }
}

//! Logging infrastructure for maildupe.
//!
//! Two layers live here:
//!
//! * The [`Logger`] capability. The deduplication engine never reaches for a
//!   global logger; the walker, the folder deduplicator and the message
//!   accessor all receive a `&dyn Logger` when they are constructed.
//!   [`LogFacade`] forwards to the `log` crate, [`RecordingLogger`] keeps the
//!   lines in memory.
//! * Backend setup via `env_logger`. Log levels are determined by (in
//!   priority order):
//!
//!   1. `RUST_LOG` environment variable (if set)
//!   2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//!   3. Default: info level
//!
//! # Build-specific Formatting
//!
//! - **Debug builds**: Include timestamp, level, and module path for detailed debugging
//! - **Release builds**: Compact format with level and message only for cleaner output
//!
//! # Example
//!
//! ```rust,no_run
//! use maildupe::logging::{init_logging, LogFacade, Logger};
//!
//! init_logging(0, false);
//!
//! let logger = LogFacade::default();
//! logger.info("Folder: Personal/Inbox");
//! ```

use std::cell::RefCell;
use std::env;
use std::io::Write;

use env_logger::Builder;
use log::{Level, LevelFilter};

/// Leveled, fire-and-forget diagnostic sink.
///
/// Implementations must never fail or panic; a sink that cannot write simply
/// drops the line.
pub trait Logger {
    /// Emit one line at the given level.
    fn log(&self, level: Level, message: &str);

    /// Emit an error line.
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    /// Emit a warning line.
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    /// Emit an informational line.
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    /// Emit a debug line.
    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
}

/// [`Logger`] that forwards to the `log` facade under a fixed target.
#[derive(Debug, Clone, Copy)]
pub struct LogFacade {
    target: &'static str,
}

impl LogFacade {
    /// Create a facade logging under `target`.
    #[must_use]
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogFacade {
    fn default() -> Self {
        Self::new("maildupe")
    }
}

impl Logger for LogFacade {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: self.target, level, "{}", message);
    }
}

/// [`Logger`] that records every line in memory.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    lines: RefCell<Vec<(Level, String)>>,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded lines in emission order.
    #[must_use]
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.borrow().clone()
    }

    /// Number of lines recorded at `level`.
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.lines.borrow().iter().filter(|(l, _)| *l == level).count()
    }

    /// Whether some line at `level` contains `needle`.
    #[must_use]
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines
            .borrow()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// This function should be called once at the start of the application,
/// before any logging calls are made.
///
/// # Priority
///
/// 1. If `RUST_LOG` environment variable is set, it takes precedence
/// 2. If `quiet` is true: Error level only
/// 3. If `verbose >= 2`: Trace level
/// 4. If `verbose == 1`: Debug level
/// 5. Default: Info level
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=normal, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
///
/// # Panics
///
/// This function will panic if called more than once, as `env_logger`
/// can only be initialized once per process.
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);

    builder.init();

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Determine the log level from CLI flags.
///
/// # Arguments
///
/// * `verbose` - Verbosity count (0=info, 1=debug, 2+=trace)
/// * `quiet` - If true, use error level
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Configure the log format based on build type and verbosity.
///
/// - Debug builds: timestamp, level, module path (for detailed debugging)
/// - Release builds: compact format (level + message only)
fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let level_style = buf.default_level_style(level);

            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or(record.target()),
                    record.args()
                )
            } else {
                writeln!(
                    buf,
                    "{} {level_style}{:<5}{level_style:#} {}",
                    timestamp,
                    level,
                    record.args()
                )
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let level_style = buf.default_level_style(level);
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        });
    }
}

/// Get the current log level as a string.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

//! Logging with colored module prefixes.
//!
//! A [`Logger`] is an explicit value created once in `main` and handed to
//! every component. It carries the [`Verbosity`] chosen on the command line,
//! so nothing reads a process-wide flag.
//!
//! # Example
//!
//! ```ignore
//! let logger = Logger::new(Verbosity::Verbose);
//!
//! log!(logger, "build"; "wrote {} files", count);
//! debug!(logger, "walk"; "classified {}", path);   // only with --verbose
//! ```

use colored::{ColoredString, Colorize};
use crossterm::{
    execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{Write, stdout},
    sync::OnceLock,
};

#[cfg(test)]
use {parking_lot::Mutex, std::sync::Arc};

/// Cached terminal width (fetched once on first use)
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Length of brackets around module name: "[]"
const BRACKET_LEN: usize = 2;
/// Space after prefix: "[module] " <- this space
const SPACE_AFTER_PREFIX: usize = 1;

/// Calculate total prefix length for a module name.
///
/// Returns: `module.len() + 3` (for "[", "]", and trailing space)
#[inline]
const fn calc_prefix_len(module_len: usize) -> usize {
    module_len + BRACKET_LEN + SPACE_AFTER_PREFIX
}

/// Get terminal width, cached after first call.
/// Falls back to 120 columns if detection fails.
fn get_terminal_width() -> u16 {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(120))
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix.
///
/// # Usage
/// ```ignore
/// log!(logger, "module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $module:expr; $($arg:tt)*) => {{
        $logger.log($module, &format!($($arg)*))
    }};
}

/// Log a message only when running verbosely.
///
/// The message is not formatted at all otherwise.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $module:expr; $($arg:tt)*) => {{
        let logger = &$logger;
        if logger.is_verbose() {
            logger.debug($module, &format!($($arg)*));
        }
    }};
}

// ============================================================================
// Logger
// ============================================================================

/// How much the tool prints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Stage summaries (default).
    #[default]
    Normal,
    /// Per-file progress and request tracing.
    Verbose,
}

impl Verbosity {
    /// Resolve the `--verbose` / `--quiet` flag pair.
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    #[cfg(test)]
    Capture(Arc<Mutex<Vec<String>>>),
}

/// Handle used by every component to report progress.
///
/// Cheap to clone; clones share the same sink.
#[derive(Debug, Clone)]
pub struct Logger {
    verbosity: Verbosity,
    sink: Sink,
}

impl Logger {
    /// Logger writing to stdout.
    pub const fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: Sink::Stdout,
        }
    }

    /// Logger recording plain (uncolored) lines in memory.
    #[cfg(test)]
    pub fn capture(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: Sink::Capture(Arc::default()),
        }
    }

    /// Lines recorded by a capturing logger, formatted as `[module] message`.
    #[cfg(test)]
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Capture(lines) => lines.lock().clone(),
            Sink::Stdout => Vec::new(),
        }
    }

    #[inline]
    pub fn is_verbose(&self) -> bool {
        self.verbosity >= Verbosity::Verbose
    }

    /// Log at normal level. `error` lines are printed even when quiet.
    pub fn log(&self, module: &str, message: &str) {
        let level = if module.eq_ignore_ascii_case("error") {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        };
        self.emit(level, module, message);
    }

    /// Log at verbose level.
    pub fn debug(&self, module: &str, message: &str) {
        self.emit(Verbosity::Verbose, module, message);
    }

    fn emit(&self, level: Verbosity, module: &str, message: &str) {
        if level > self.verbosity {
            return;
        }
        match &self.sink {
            Sink::Stdout => write_stdout(module, message),
            #[cfg(test)]
            Sink::Capture(lines) => lines.lock().push(format!("[{module}] {message}")),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Write a prefixed line to stdout.
///
/// Automatically truncates long messages to fit terminal width.
fn write_stdout(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    let width = get_terminal_width() as usize;

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();

    let prefix_len = calc_prefix_len(module.len());
    let max_msg_len = width.saturating_sub(prefix_len);
    let message = truncate_str(message, max_msg_len);

    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type.
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" | "request" => prefix.bright_blue().bold(),
        "error" => prefix.bright_red().bold(),
        "warn" => prefix.bright_magenta().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

/// Truncate a string to fit within max_len bytes.
///
/// Ensures the result is valid UTF-8 by finding the nearest character boundary.
#[inline]
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Tests
// ============================================================================

//! Leveled user-facing output.
//!
//! Command output and diagnostics meant for the user go through a
//! [`MessageSink`]. Internal tracing is separate, but the console keeps the
//! tracing filter in step with the user's verbosity.

use std::io::Write;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{Registry, reload};
use ubox_common::types::Verbosity;

/// Destination for user-facing messages.
pub trait MessageSink {
    /// Current verbosity.
    fn level(&self) -> Verbosity;

    /// Changes the verbosity for all subsequent messages.
    fn set_level(&mut self, level: Verbosity);

    /// Writes `text` to standard output if `level` is enabled.
    fn out(&mut self, level: Verbosity, text: &str);

    /// Writes `text` to standard error.
    fn err(&mut self, text: &str);
}

/// Handle on the process-wide tracing level.
pub type FilterHandle = reload::Handle<LevelFilter, Registry>;

/// Maps user verbosity onto the tracing filter.
#[must_use]
pub const fn tracing_level(level: Verbosity) -> LevelFilter {
    match level {
        Verbosity::Debug => LevelFilter::DEBUG,
        Verbosity::Verbose => LevelFilter::INFO,
        Verbosity::Info | Verbosity::Warning => LevelFilter::WARN,
        Verbosity::Message | Verbosity::Error => LevelFilter::ERROR,
    }
}

/// Sink writing to the process's stdout and stderr.
#[derive(Debug)]
pub struct Console {
    level: Verbosity,
    filter: Option<FilterHandle>,
}

impl Console {
    /// Creates a console at the default verbosity.
    ///
    /// When `filter` is given, level changes are mirrored onto it.
    #[must_use]
    pub fn new(filter: Option<FilterHandle>) -> Self {
        Self {
            level: Verbosity::default(),
            filter,
        }
    }
}

impl MessageSink for Console {
    fn level(&self) -> Verbosity {
        self.level
    }

    fn set_level(&mut self, level: Verbosity) {
        self.level = level;
        if let Some(handle) = &self.filter {
            if let Err(e) = handle.reload(tracing_level(level)) {
                tracing::warn!(error = %e, "failed to update log filter");
            }
        }
    }

    fn out(&mut self, level: Verbosity, text: &str) {
        if level <= self.level {
            let _ = writeln!(std::io::stdout().lock(), "{text}");
        }
    }

    fn err(&mut self, text: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{text}");
    }
}

/// Sink capturing messages in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    /// Current verbosity.
    pub level: Verbosity,
    /// Enabled stdout messages, in order.
    pub out: Vec<String>,
    /// Stderr messages, in order.
    pub err: Vec<String>,
}

#[cfg(test)]
impl Recorder {
    /// Stdout messages joined by newlines.
    pub fn stdout(&self) -> String {
        self.out.join("\n")
    }

    /// Stderr messages joined by newlines.
    pub fn stderr(&self) -> String {
        self.err.join("\n")
    }
}

#[cfg(test)]
impl MessageSink for Recorder {
    fn level(&self) -> Verbosity {
        self.level
    }

    fn set_level(&mut self, level: Verbosity) {
        self.level = level;
    }

    fn out(&mut self, level: Verbosity, text: &str) {
        if level <= self.level {
            self.out.push(text.to_string());
        }
    }

    fn err(&mut self, text: &str) {
        self.err.push(text.to_string());
    }
}

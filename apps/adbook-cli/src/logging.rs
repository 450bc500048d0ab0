//! Diagnostic logging
//!
//! Library crates log through `tracing`. The CLI installs a `fmt` subscriber
//! writing to stderr so console narration on stdout stays clean. `RUST_LOG`
//! takes precedence over the `-v`/`-q` flags.

use std::fmt;
use tracing_subscriber::EnvFilter;

/// Verbosity selected on the command line.
///
/// Levels are ordered: Quiet < Normal < Verbose < Debug < Trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Errors only
    Quiet,
    /// Warnings and errors (default)
    #[default]
    Normal,
    /// Fetch and export milestones
    Verbose,
    /// Protocol steps and per-contact results
    Debug,
    /// Everything, including dependencies
    Trace,
}

impl LogLevel {
    /// Create LogLevel from CLI flags
    ///
    /// `quiet` wins over any number of `-v`.
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, 2) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "warn,adbook_directory=info,adbook_export=info,adbook_cli=info",
            Self::Debug => "info,adbook_directory=debug,adbook_export=debug,adbook_cli=debug",
            Self::Trace => "trace",
        }
    }

    /// Whether console narration should be printed.
    pub fn is_quiet(&self) -> bool {
        *self == Self::Quiet
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quiet => "QUIET",
            Self::Normal => "NORMAL",
            Self::Verbose => "VERBOSE",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        };
        f.write_str(name)
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(level >= LogLevel::Debug)
        .try_init();
}

/// Initialize logging for tests (with simpler output).
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Quiet < LogLevel::Normal);
        assert!(LogLevel::Normal < LogLevel::Verbose);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(LogLevel::from_flags(0, false), LogLevel::Normal);
        assert_eq!(LogLevel::from_flags(1, false), LogLevel::Verbose);
        assert_eq!(LogLevel::from_flags(2, false), LogLevel::Debug);
        assert_eq!(LogLevel::from_flags(7, false), LogLevel::Trace);
        assert_eq!(LogLevel::from_flags(3, true), LogLevel::Quiet);
    }

    #[test]
    fn test_directives_parse() {
        for level in [
            LogLevel::Quiet,
            LogLevel::Normal,
            LogLevel::Verbose,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(
                EnvFilter::try_new(level.directive()).is_ok(),
                "bad directive for {level}"
            );
        }
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_test_logging();
        init_logging(LogLevel::Debug);
    }
}

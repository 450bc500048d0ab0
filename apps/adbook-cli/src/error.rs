//! CLI error types and exit codes

use thiserror::Error;

use adbook_export::ExportError;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success, including a run with no data to save
/// - 1: Configuration error
/// - 2: Export aborted
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("The {0} contact store is not available on this platform.\n\nOptions:\n  - Run on Windows with Outlook installed\n  - Use a portable store: --store csv")]
    UnsupportedStore(String),

    #[error("Export aborted: {0}")]
    Export(#[from] ExportError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::UnsupportedStore(_) => 1,
            CliError::Export(_) => 2,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        let mut source = std::error::Error::source(self).and_then(std::error::Error::source);
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(ConfigError::Missing { .. }) => {
                Some("Set the value in the config file or in a .env file next to the binary.")
            }
            CliError::Export(ExportError::ClientUnavailable { .. }) => {
                Some("Start Outlook once for this user, or export with --store csv.")
            }
            CliError::Export(ExportError::StoreExists { .. }) => {
                Some("Wait a second and run again, or pick another --output-dir.")
            }
            CliError::Export(ExportError::OutputDirectory { .. }) => {
                Some("Check that the output directory is writable.")
            }
            _ => None,
        }
    }
}

//! Command-line arguments

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{FileConfig, StoreKind};
use crate::logging::LogLevel;

/// Export Global Catalog users (name, mail) into a new contact store.
///
/// Directory settings come from the config file and ADBOOK_* environment
/// variables; the bind secret is never taken from the command line.
#[derive(Debug, Parser)]
#[command(name = "adbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the contact store is created in [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Contact store to write
    #[arg(short, long, value_enum)]
    pub store: Option<StoreKind>,

    /// Wait before detaching a store the mail client cannot confirm as flushed
    #[arg(long, value_name = "MS")]
    pub settle_delay_ms: Option<u64>,

    /// More log output (repeat for more)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only print errors and the final summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Log level selected by `-v`/`-q`.
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_flags(self.verbose, self.quiet)
    }

    /// Settings given as flags, layered over file and environment.
    pub fn overrides(&self) -> FileConfig {
        FileConfig {
            output_dir: self.output_dir.clone(),
            store: self.store,
            settle_delay_ms: self.settle_delay_ms,
            ..Default::default()
        }
    }
}

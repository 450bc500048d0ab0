//! adbook CLI library
//!
//! The binary in `main.rs` only parses arguments and maps errors to exit
//! codes; everything else lives here so it can be tested.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod reporter;

pub use cli::Cli;
pub use error::{CliError, CliResult};
pub use pipeline::{export_records, run};

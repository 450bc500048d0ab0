//! Configuration for the adbook CLI
//!
//! Settings come from three layers, later ones winning: a JSON config file,
//! `ADBOOK_*` environment variables (a `.env` file is loaded first), and
//! command-line flags.

mod settings;
mod store;

pub use settings::{AppConfig, ExportSettings, FileConfig, ENV_PREFIX};
pub use store::StoreKind;

use std::path::PathBuf;
use thiserror::Error;

use adbook_directory::ConnectionError;

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {key} (set {env} or \"{key}\" in the config file)")]
    Missing {
        key: &'static str,
        env: &'static str,
    },

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to read config file {}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Directory(#[from] ConnectionError),
}

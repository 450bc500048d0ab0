//! Contact store selection

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;

/// Which mail client adapter writes the contact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Outlook data file through COM automation (Windows only)
    Outlook,
    /// CSV file with Outlook import columns
    Csv,
    /// Keep contacts in memory; nothing is written
    Memory,
}

impl StoreKind {
    /// Outlook where it can exist, CSV everywhere else.
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            Self::Outlook
        } else {
            Self::Csv
        }
    }

    /// Name as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Outlook => "outlook",
            Self::Csv => "csv",
            Self::Memory => "memory",
        }
    }
}

impl Default for StoreKind {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s.trim(), true)
            .map_err(|_| format!("expected one of outlook, csv, memory; got '{s}'"))
    }
}

//! # Contact Export
//!
//! Writes user records into a new contact store of a desktop mail client.
//!
//! ## Architecture
//!
//! - [`MailClient`] - The capability the exporter needs from a mail client
//! - [`ContactExporter`] - Creates a timestamped store, saves one contact per
//!   record with a mail address, then detaches the store
//! - [`ExportObserver`] - Progress callbacks for console narration
//!
//! Adapters:
//!
//! - `OutlookClient` - Outlook through COM automation (Windows only)
//! - [`CsvContactClient`] - A CSV file with one column per contact property
//! - [`MemoryClient`] - Keeps contacts in memory; used by tests and dry runs
//!
//! ## Example
//!
//! ```
//! use adbook_core::UserRecord;
//! use adbook_export::prelude::*;
//! use std::time::Duration;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let options = ExportOptions::default()
//!     .with_output_dir(dir.path())
//!     .with_settle_delay(Duration::ZERO);
//! let mut exporter = ContactExporter::new(MemoryClient::new(), options);
//!
//! let records = vec![UserRecord::from_raw(Some("Ivanov Petr"), Some("petr@example.com"))];
//! match exporter.export(&records, &mut SilentExport).unwrap() {
//!     ExportOutcome::Completed(summary) => assert_eq!(summary.added, 1),
//!     ExportOutcome::NoData => unreachable!(),
//! }
//! ```

pub mod client;
pub mod csv_store;
pub mod error;
pub mod exporter;
pub mod memory;
#[cfg(windows)]
pub mod outlook;

// Re-exports
pub use client::MailClient;
pub use csv_store::CsvContactClient;
pub use error::{ExportError, ExportResult};
pub use exporter::{
    store_file_name, ContactExporter, ExportObserver, ExportOptions, ExportOutcome, ExportSummary,
    ItemOutcome, SilentExport, DEFAULT_SETTLE_DELAY,
};
pub use memory::MemoryClient;
#[cfg(windows)]
pub use outlook::OutlookClient;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::MailClient;
    pub use crate::csv_store::CsvContactClient;
    pub use crate::error::{ExportError, ExportResult};
    pub use crate::exporter::{
        ContactExporter, ExportObserver, ExportOptions, ExportOutcome, ExportSummary,
        ItemOutcome, SilentExport,
    };
    pub use crate::memory::MemoryClient;
    #[cfg(windows)]
    pub use crate::outlook::OutlookClient;
}

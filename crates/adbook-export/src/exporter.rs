//! Contact export
//!
//! [`ContactExporter`] writes fetched user records into a freshly created
//! contact store: one contact per record with a mail address, each saved on
//! its own so a failed item never aborts the batch.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use adbook_core::{ContactFields, ContactId, UserRecord};

use crate::client::MailClient;
use crate::error::{ExportError, ExportResult};

/// Default wait before detaching a store the client cannot confirm as flushed.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// File name of the store created at `now`: `contacts_<YYYYMMDD_HHMMSS>.<ext>`.
#[must_use]
pub fn store_file_name(extension: &str, now: DateTime<Local>) -> String {
    format!("contacts_{}.{}", now.format("%Y%m%d_%H%M%S"), extension)
}

/// Options controlling where and how a store is written.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory the store file is created in.
    pub output_dir: PathBuf,

    /// Wait before detaching when the client cannot confirm a flush.
    pub settle_delay: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl ExportOptions {
    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Why a record did not become a contact.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Contact saved.
    Added(ContactId),
    /// Record has no mail address.
    NoMail,
    /// The client failed to save the contact.
    Failed(ExportError),
}

impl ItemOutcome {
    /// Whether the record was counted as skipped.
    pub fn is_skipped(&self) -> bool {
        !matches!(self, ItemOutcome::Added(_))
    }
}

/// Counts reported at the end of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Records received.
    pub total: usize,
    /// Contacts saved.
    pub added: usize,
    /// Records not saved, for any reason.
    pub skipped: usize,
    /// Of the skipped records, those the client failed to save.
    pub failed: usize,
    /// Resolved path of the store file.
    pub store_path: PathBuf,
    /// Whether the store was written to disk; false for dry runs.
    pub written: bool,
}

/// Result of an export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// No records were given; nothing was created.
    NoData,
    /// A store was written.
    Completed(ExportSummary),
}

/// Receives export progress for console narration.
pub trait ExportObserver {
    /// The record list was empty.
    fn on_no_data(&mut self) {}

    /// The store file was created and attached.
    fn on_store_created(&mut self, _path: &Path) {}

    /// The item loop is starting.
    fn on_start(&mut self, _total: usize) {}

    /// About to process record `index`.
    fn on_item_start(&mut self, _index: usize, _record: &UserRecord) {}

    /// Record `index` was processed.
    fn on_item_done(&mut self, _index: usize, _record: &UserRecord, _outcome: &ItemOutcome) {}

    /// All records were processed.
    fn on_summary(&mut self, _summary: &ExportSummary) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentExport;

impl ExportObserver for SilentExport {}

type Clock = Box<dyn Fn() -> DateTime<Local>>;
type Sleep = Box<dyn FnMut(Duration)>;

/// Writes user records into a new contact store of a [`MailClient`].
pub struct ContactExporter<C: MailClient> {
    client: C,
    options: ExportOptions,
    clock: Clock,
    sleep: Sleep,
}

impl<C: MailClient> ContactExporter<C> {
    /// Create an exporter using the local wall clock.
    pub fn new(client: C, options: ExportOptions) -> Self {
        Self {
            client,
            options,
            clock: Box::new(Local::now),
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the clock used to timestamp store names.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the wait used for the settle delay.
    #[must_use]
    pub fn with_sleep(mut self, sleep: impl FnMut(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// The wrapped client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Absolute path of the store this exporter would create now.
    pub fn next_store_path(&self) -> ExportResult<PathBuf> {
        let dir = &self.options.output_dir;
        let dir = if dir.is_absolute() {
            dir.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| ExportError::OutputDirectory {
                    path: dir.clone(),
                    source: e,
                })?
                .join(dir)
        };

        Ok(dir.join(store_file_name(
            self.client.store_extension(),
            (self.clock)(),
        )))
    }

    /// Export `records` into a new store.
    ///
    /// Store-level failures abort with an error. Item-level failures are
    /// reported through the observer and counted as skipped.
    #[instrument(skip_all, fields(client = %self.client.name(), records = records.len()))]
    pub fn export(
        &mut self,
        records: &[UserRecord],
        observer: &mut dyn ExportObserver,
    ) -> ExportResult<ExportOutcome> {
        if records.is_empty() {
            info!("No records to export");
            observer.on_no_data();
            return Ok(ExportOutcome::NoData);
        }

        let path = self.next_store_path()?;
        if path.exists() {
            return Err(ExportError::StoreExists { path });
        }
        let written = self.client.persists();
        if let Some(dir) = path.parent().filter(|_| written) {
            std::fs::create_dir_all(dir).map_err(|e| ExportError::OutputDirectory {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }

        let store = self.client.create_store(&path)?;
        let store_path = self.client.store_path(&store);
        info!(path = %store_path.display(), "Contact store created");
        observer.on_store_created(&store_path);

        let folder = match self.client.default_contacts_folder(&store) {
            Ok(folder) => folder,
            Err(e) => {
                if let Err(detach_err) = self.client.remove_store(store) {
                    warn!(error = %detach_err, "Error while detaching contact store");
                }
                return Err(e);
            }
        };

        let mut summary = self.write_contacts(&folder, records, store_path, observer);
        summary.written = written;
        info!(
            added = summary.added,
            skipped = summary.skipped,
            failed = summary.failed,
            path = %summary.store_path.display(),
            "Contact export completed"
        );
        observer.on_summary(&summary);

        self.detach(store);

        Ok(ExportOutcome::Completed(summary))
    }

    fn write_contacts(
        &mut self,
        folder: &C::Folder,
        records: &[UserRecord],
        store_path: PathBuf,
        observer: &mut dyn ExportObserver,
    ) -> ExportSummary {
        let mut summary = ExportSummary {
            total: records.len(),
            added: 0,
            skipped: 0,
            failed: 0,
            store_path,
            written: false,
        };

        observer.on_start(records.len());
        for (index, record) in records.iter().enumerate() {
            observer.on_item_start(index, record);

            let outcome = match ContactFields::from_record(record) {
                None => ItemOutcome::NoMail,
                Some(fields) => match self.client.add_contact(folder, &fields) {
                    Ok(id) => {
                        debug!(mail = %fields.email_address, id = %id, "Contact saved");
                        ItemOutcome::Added(id)
                    }
                    Err(e) => {
                        let mail = &fields.email_address;
                        if e.is_item_level() {
                            warn!(
                                mail = %mail,
                                code = e.error_code(),
                                error = %e,
                                "Failed to save contact"
                            );
                        } else {
                            error!(
                                mail = %mail,
                                code = e.error_code(),
                                error = %e,
                                "Contact store failed while saving"
                            );
                        }
                        summary.failed += 1;
                        ItemOutcome::Failed(e)
                    }
                },
            };

            if outcome.is_skipped() {
                summary.skipped += 1;
            } else {
                summary.added += 1;
            }
            observer.on_item_done(index, record, &outcome);
        }

        summary
    }

    fn detach(&mut self, store: C::Store) {
        let delay = self.options.settle_delay;
        match self.client.flush(&store) {
            Ok(true) => debug!("Store flush confirmed"),
            Ok(false) => {
                debug!(
                    delay_ms = delay.as_millis() as u64,
                    "Waiting before detaching store"
                );
                (self.sleep)(delay);
            }
            Err(e) => {
                warn!(error = %e, "Store flush failed");
                (self.sleep)(delay);
            }
        }

        if let Err(e) = self.client.remove_store(store) {
            warn!(error = %e, "Error while detaching contact store");
        }
    }
}

impl<C: MailClient> std::fmt::Debug for ContactExporter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactExporter")
            .field("client", &self.client.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

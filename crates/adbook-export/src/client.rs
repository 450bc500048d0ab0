//! Mail client capability
//!
//! The narrow set of operations the exporter needs from a desktop mail
//! client. Adapters implement it for Outlook, for a plain CSV file and for
//! an in-memory recorder.

use std::path::{Path, PathBuf};

use adbook_core::{ContactFields, ContactId};

use crate::error::ExportResult;

/// A mail client able to hold contacts in a separate, file-backed store.
pub trait MailClient {
    /// Handle of an attached store.
    type Store;

    /// Handle of a contacts folder inside a store.
    type Folder;

    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// File extension of the stores this client creates, without the dot.
    fn store_extension(&self) -> &str;

    /// Whether created stores end up as files on disk.
    fn persists(&self) -> bool {
        true
    }

    /// Create a new store at `path` and attach it to the session.
    ///
    /// `path` is absolute and does not exist yet.
    fn create_store(&mut self, path: &Path) -> ExportResult<Self::Store>;

    /// Where the client actually placed the store.
    fn store_path(&self, store: &Self::Store) -> PathBuf;

    /// Locate (or create) the default contacts folder of a store.
    fn default_contacts_folder(&mut self, store: &Self::Store) -> ExportResult<Self::Folder>;

    /// Create and save one contact item.
    fn add_contact(
        &mut self,
        folder: &Self::Folder,
        fields: &ContactFields,
    ) -> ExportResult<ContactId>;

    /// Push pending writes for `store` to disk.
    ///
    /// Returns `Ok(true)` when the client confirms the store is flushed and
    /// can be detached right away, `Ok(false)` when it cannot tell.
    fn flush(&mut self, _store: &Self::Store) -> ExportResult<bool> {
        Ok(false)
    }

    /// Detach the store from the session. The file stays on disk.
    fn remove_store(&mut self, store: Self::Store) -> ExportResult<()>;
}

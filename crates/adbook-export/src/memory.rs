//! In-memory mail client
//!
//! Records every call and keeps saved contacts in memory. Used by tests and
//! by dry runs of the CLI.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use adbook_core::{ContactFields, ContactId};

use crate::client::MailClient;
use crate::error::{ExportError, ExportResult};

/// A call made against a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCall {
    CreateStore(PathBuf),
    DefaultContactsFolder(PathBuf),
    AddContact(String),
    Flush(PathBuf),
    RemoveStore(PathBuf),
}

/// Handle of a store held by a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStore(PathBuf);

/// Handle of the contacts folder of a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFolder(PathBuf);

/// Mail client that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryClient {
    calls: Vec<MemoryCall>,
    stores: HashMap<PathBuf, Vec<(ContactId, ContactFields)>>,
    attached: HashSet<PathBuf>,
    fail_store_creation: bool,
    fail_contacts_folder: bool,
    failing_addresses: HashSet<String>,
    confirms_flush: bool,
}

impl MemoryClient {
    /// Create an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_store` fail.
    #[must_use]
    pub fn failing_store_creation(mut self) -> Self {
        self.fail_store_creation = true;
        self
    }

    /// Make `default_contacts_folder` fail.
    #[must_use]
    pub fn failing_contacts_folder(mut self) -> Self {
        self.fail_contacts_folder = true;
        self
    }

    /// Make saving a contact with this address fail.
    pub fn failing_address(mut self, address: impl Into<String>) -> Self {
        self.failing_addresses.insert(address.into());
        self
    }

    /// Make `flush` confirm the store as written.
    #[must_use]
    pub fn confirming_flush(mut self) -> Self {
        self.confirms_flush = true;
        self
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> &[MemoryCall] {
        &self.calls
    }

    /// Contacts saved into the store at `path`.
    #[must_use]
    pub fn contacts(&self, path: &Path) -> Vec<ContactFields> {
        self.stores
            .get(path)
            .map(|items| items.iter().map(|(_, fields)| fields.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether the store at `path` is still attached.
    #[must_use]
    pub fn is_attached(&self, path: &Path) -> bool {
        self.attached.contains(path)
    }
}

impl MailClient for MemoryClient {
    type Store = MemoryStore;
    type Folder = MemoryFolder;

    fn name(&self) -> &str {
        "memory"
    }

    fn store_extension(&self) -> &str {
        "mem"
    }

    fn persists(&self) -> bool {
        false
    }

    fn create_store(&mut self, path: &Path) -> ExportResult<MemoryStore> {
        self.calls.push(MemoryCall::CreateStore(path.to_path_buf()));
        if self.fail_store_creation {
            return Err(ExportError::store_creation(path, "store creation disabled"));
        }
        if self.stores.contains_key(path) {
            return Err(ExportError::store_creation(path, "store already attached"));
        }

        self.stores.insert(path.to_path_buf(), Vec::new());
        self.attached.insert(path.to_path_buf());
        Ok(MemoryStore(path.to_path_buf()))
    }

    fn store_path(&self, store: &MemoryStore) -> PathBuf {
        store.0.clone()
    }

    fn default_contacts_folder(&mut self, store: &MemoryStore) -> ExportResult<MemoryFolder> {
        self.calls
            .push(MemoryCall::DefaultContactsFolder(store.0.clone()));
        if self.fail_contacts_folder {
            return Err(ExportError::folder_unavailable("contacts folder disabled"));
        }
        Ok(MemoryFolder(store.0.clone()))
    }

    fn add_contact(
        &mut self,
        folder: &MemoryFolder,
        fields: &ContactFields,
    ) -> ExportResult<ContactId> {
        self.calls
            .push(MemoryCall::AddContact(fields.email_address.clone()));
        if self.failing_addresses.contains(&fields.email_address) {
            return Err(ExportError::item_commit(
                fields.email_address.clone(),
                "save rejected",
            ));
        }

        let items = self
            .stores
            .get_mut(&folder.0)
            .ok_or_else(|| ExportError::folder_unavailable("store is not attached"))?;
        let id = ContactId::new(Uuid::new_v4().to_string());
        items.push((id.clone(), fields.clone()));
        Ok(id)
    }

    fn flush(&mut self, store: &MemoryStore) -> ExportResult<bool> {
        self.calls.push(MemoryCall::Flush(store.0.clone()));
        Ok(self.confirms_flush)
    }

    fn remove_store(&mut self, store: MemoryStore) -> ExportResult<()> {
        self.calls.push(MemoryCall::RemoveStore(store.0.clone()));
        if !self.attached.remove(&store.0) {
            return Err(ExportError::detach("store is not attached"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(mail: &str) -> ContactFields {
        ContactFields {
            email_address: mail.to_string(),
            email_display_name: mail.to_string(),
            first_name: None,
            last_name: None,
            full_name: mail.to_string(),
        }
    }

    #[test]
    fn test_store_lifecycle() {
        let mut client = MemoryClient::new();
        let path = PathBuf::from("/tmp/contacts_1.mem");

        let store = client.create_store(&path).unwrap();
        assert!(client.is_attached(&path));

        let folder = client.default_contacts_folder(&store).unwrap();
        client.add_contact(&folder, &fields("a@b.com")).unwrap();
        client.remove_store(store).unwrap();

        assert!(!client.is_attached(&path));
        assert_eq!(client.contacts(&path).len(), 1);
    }

    #[test]
    fn test_duplicate_store_is_rejected() {
        let mut client = MemoryClient::new();
        let path = PathBuf::from("/tmp/contacts_1.mem");

        client.create_store(&path).unwrap();
        assert!(client.create_store(&path).is_err());
    }

    #[test]
    fn test_failing_address() {
        let mut client = MemoryClient::new().failing_address("x@b.com");
        let store = client.create_store(Path::new("/tmp/c.mem")).unwrap();
        let folder = client.default_contacts_folder(&store).unwrap();

        let err = client.add_contact(&folder, &fields("x@b.com")).unwrap_err();
        assert!(err.is_item_level());
        assert!(client.contacts(Path::new("/tmp/c.mem")).is_empty());
    }

    #[test]
    fn test_failing_contacts_folder() {
        let mut client = MemoryClient::new().failing_contacts_folder();
        let store = client.create_store(Path::new("/tmp/c.mem")).unwrap();

        let err = client.default_contacts_folder(&store).unwrap_err();
        assert!(matches!(err, ExportError::FolderUnavailable { .. }));
        assert!(!client.persists());
        assert!(client.contacts(Path::new("/tmp/c.mem")).is_empty());
    }

    #[test]
    fn test_flush_confirmation() {
        let mut client = MemoryClient::new().confirming_flush();
        let store = client.create_store(Path::new("/tmp/c.mem")).unwrap();
        assert!(client.flush(&store).unwrap());
    }
}

//! CSV contact store
//!
//! Writes contacts to a CSV file. Columns are named after the Outlook
//! contact item properties the Outlook adapter sets, so both stores carry
//! the same fields.

use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use adbook_core::{ContactFields, ContactId};

use crate::client::MailClient;
use crate::error::{ExportError, ExportResult};

/// Column headers, in write order.
pub const CSV_HEADERS: [&str; 5] = [
    "FullName",
    "LastName",
    "FirstName",
    "Email1Address",
    "Email1DisplayName",
];

/// Handle of an open CSV store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvStore {
    path: PathBuf,
}

/// The single contacts folder of a CSV store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvFolder;

/// Mail client writing a CSV file.
#[derive(Debug, Default)]
pub struct CsvContactClient {
    writer: Option<Writer<File>>,
    rows: u64,
}

impl CsvContactClient {
    /// Create a client with no open store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn writer(&mut self) -> ExportResult<&mut Writer<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| ExportError::folder_unavailable("no CSV store is open"))
    }
}

impl MailClient for CsvContactClient {
    type Store = CsvStore;
    type Folder = CsvFolder;

    fn name(&self) -> &str {
        "csv"
    }

    fn store_extension(&self) -> &str {
        "csv"
    }

    fn create_store(&mut self, path: &Path) -> ExportResult<CsvStore> {
        if self.writer.is_some() {
            return Err(ExportError::store_creation(path, "a CSV store is already open"));
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| ExportError::store_creation_with_source(path, "cannot create file", e))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(CSV_HEADERS)
            .map_err(|e| ExportError::store_creation_with_source(path, "cannot write header", e))?;

        debug!(path = %path.display(), "CSV store created");
        self.writer = Some(writer);
        self.rows = 0;
        Ok(CsvStore {
            path: path.to_path_buf(),
        })
    }

    fn store_path(&self, store: &CsvStore) -> PathBuf {
        store.path.clone()
    }

    fn default_contacts_folder(&mut self, _store: &CsvStore) -> ExportResult<CsvFolder> {
        self.writer()?;
        Ok(CsvFolder)
    }

    fn add_contact(
        &mut self,
        _folder: &CsvFolder,
        fields: &ContactFields,
    ) -> ExportResult<ContactId> {
        let row = [
            fields.full_name.as_str(),
            fields.last_name.as_deref().unwrap_or_default(),
            fields.first_name.as_deref().unwrap_or_default(),
            fields.email_address.as_str(),
            fields.email_display_name.as_str(),
        ];

        self.writer()?.write_record(row).map_err(|e| {
            ExportError::item_commit_with_source(
                fields.email_address.clone(),
                "cannot write row",
                e,
            )
        })?;

        self.rows += 1;
        Ok(ContactId::new(self.rows.to_string()))
    }

    fn flush(&mut self, _store: &CsvStore) -> ExportResult<bool> {
        self.writer()?
            .flush()
            .map_err(|e| ExportError::Detach {
                message: "cannot flush CSV store".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(true)
    }

    fn remove_store(&mut self, store: CsvStore) -> ExportResult<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| ExportError::detach("no CSV store is open"))?;
        writer.flush().map_err(|e| ExportError::Detach {
            message: format!("cannot close {}", store.path.display()),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adbook_core::UserRecord;

    fn fields(name: &str, mail: &str) -> ContactFields {
        ContactFields::from_record(&UserRecord::from_raw(Some(name), Some(mail))).unwrap()
    }

    #[test]
    fn test_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contacts_20260101_000000.csv");
        let mut client = CsvContactClient::new();

        let store = client.create_store(&path).unwrap();
        let folder = client.default_contacts_folder(&store).unwrap();
        let first = client
            .add_contact(&folder, &fields("Ivanov Petr", "petr@example.com"))
            .unwrap();
        client
            .add_contact(&folder, &fields("", "a@b.com"))
            .unwrap();
        assert!(client.flush(&store).unwrap());
        client.remove_store(store).unwrap();

        assert_eq!(first.as_str(), "1");
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "FullName,LastName,FirstName,Email1Address,Email1DisplayName\n\
             Ivanov Petr,Ivanov,Petr,petr@example.com,petr@example.com\n\
             a@b.com,,,a@b.com,a@b.com\n"
        );
    }

    #[test]
    fn test_quoted_values_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        let mut client = CsvContactClient::new();

        let store = client.create_store(&path).unwrap();
        client
            .add_contact(&CsvFolder, &fields("Ivanov, Petr", "petr@example.com"))
            .unwrap();
        client.remove_store(store).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], "\"Ivanov, Petr\"");
        assert_eq!(&row[3], "petr@example.com");
    }

    #[test]
    fn test_existing_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        std::fs::write(&path, "keep").unwrap();

        let err = CsvContactClient::new().create_store(&path).unwrap_err();

        assert!(matches!(err, ExportError::StoreCreation { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");
    }

    #[test]
    fn test_add_without_store_fails() {
        let mut client = CsvContactClient::new();
        assert!(client
            .add_contact(&CsvFolder, &fields("A", "a@b.com"))
            .is_err());
    }
}

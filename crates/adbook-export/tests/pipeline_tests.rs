//! Fetch-then-export pipeline tests.
//!
//! Runs the directory fetcher against a scripted session and feeds its
//! records into the exporter with in-memory and CSV clients.

use async_trait::async_trait;
use std::time::Duration;

use adbook_directory::{
    ConnectionError, DirectoryEntry, DirectoryFetcher, DirectorySession, FetchResult,
    GlobalCatalogConfig, SearchRequest, SilentFetch,
};
use adbook_export::prelude::*;

struct ScriptedSession {
    entries: Vec<DirectoryEntry>,
    bind_rc: Option<u32>,
}

#[async_trait]
impl DirectorySession for ScriptedSession {
    async fn bind(&mut self, principal: &str, _password: &str) -> FetchResult<()> {
        match self.bind_rc {
            Some(rc) => Err(ConnectionError::bind_rejected(
                principal,
                rc,
                "80090308: LdapErr: DSID-0C09044E, comment: AcceptSecurityContext error, data 52e, v4563",
            )),
            None => Ok(()),
        }
    }

    async fn search(&mut self, _request: &SearchRequest) -> FetchResult<Vec<DirectoryEntry>> {
        Ok(self.entries.clone())
    }

    async fn unbind(&mut self) -> FetchResult<()> {
        Ok(())
    }
}

fn fetcher() -> DirectoryFetcher {
    DirectoryFetcher::new(
        GlobalCatalogConfig::new("gc.corp.example.com", "svc-export", "corp.example.com")
            .with_password("secret"),
    )
    .unwrap()
}

fn directory() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry::new("CN=Ivanov Petr,OU=Staff,DC=corp,DC=example,DC=com")
            .with("name", "Ivanov Petr")
            .with("mail", "petr.ivanov@corp.example.com"),
        DirectoryEntry::new("CN=Room 101,OU=Resources,DC=corp,DC=example,DC=com")
            .with("name", "Room 101"),
        DirectoryEntry::new("CN=Sidorova,OU=Staff,DC=corp,DC=example,DC=com")
            .with("name", "Sidorova")
            .with("mail", "sidorova@corp.example.com"),
    ]
}

fn options(dir: &std::path::Path) -> ExportOptions {
    ExportOptions::default()
        .with_output_dir(dir)
        .with_settle_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_fetched_users_become_contacts() {
    let mut session = ScriptedSession {
        entries: directory(),
        bind_rc: None,
    };
    let records = fetcher()
        .fetch_users_with(&mut session, &mut SilentFetch)
        .await;
    assert_eq!(records.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let mut exporter = ContactExporter::new(MemoryClient::new(), options(dir.path()));
    let outcome = exporter.export(&records, &mut SilentExport).unwrap();

    let ExportOutcome::Completed(summary) = outcome else {
        panic!("expected a completed export");
    };
    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped, 1);

    let contacts = exporter.client().contacts(&summary.store_path);
    let names: Vec<_> = contacts.iter().map(|c| c.full_name.as_str()).collect();
    assert_eq!(names, vec!["Ivanov Petr", "Sidorova"]);
    assert!(!exporter.client().is_attached(&summary.store_path));
}

#[tokio::test]
async fn test_rejected_bind_exports_nothing() {
    let mut session = ScriptedSession {
        entries: directory(),
        bind_rc: Some(49),
    };
    let records = fetcher()
        .fetch_users_with(&mut session, &mut SilentFetch)
        .await;
    assert!(records.is_empty());

    let dir = tempfile::tempdir().unwrap();
    let mut exporter = ContactExporter::new(MemoryClient::new(), options(dir.path()));
    let outcome = exporter.export(&records, &mut SilentExport).unwrap();

    assert_eq!(outcome, ExportOutcome::NoData);
    assert!(exporter.client().calls().is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_csv_store_file_is_written() {
    let mut session = ScriptedSession {
        entries: directory(),
        bind_rc: None,
    };
    let records = fetcher()
        .fetch_users_with(&mut session, &mut SilentFetch)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut exporter = ContactExporter::new(CsvContactClient::new(), options(dir.path()));
    let ExportOutcome::Completed(summary) = exporter.export(&records, &mut SilentExport).unwrap()
    else {
        panic!("expected a completed export");
    };

    assert!(summary.written);
    let file_name = summary.store_path.file_name().unwrap().to_string_lossy();
    assert!(file_name.starts_with("contacts_"));
    assert!(file_name.ends_with(".csv"));

    let mut reader = csv::Reader::from_path(&summary.store_path).unwrap();
    let rows: Vec<_> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "Ivanov");
    assert_eq!(&rows[0][2], "Petr");
    assert_eq!(&rows[1][1], "Sidorova");
    assert_eq!(&rows[1][2], "");
}

//! Integration tests for the export half of a run
//!
//! Tests cover:
//! - Config file plus environment resolved into export settings
//! - Console output for a completed export
//! - Console output when there is nothing to save

use std::collections::HashMap;
use std::io::Write;

use adbook_cli::config::{AppConfig, FileConfig, StoreKind};
use adbook_cli::export_records;
use adbook_cli::reporter::ConsoleReporter;
use adbook_core::UserRecord;
use adbook_export::ExportOutcome;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn load(dir: &std::path::Path) -> AppConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "server": "gc.corp.example.com", "principal": "svc-export", "domain": "corp.example.com", "store": "csv" }}"#
    )
    .unwrap();

    let flags = FileConfig {
        output_dir: Some(dir.to_path_buf()),
        settle_delay_ms: Some(0),
        ..Default::default()
    };
    AppConfig::from_sources(Some(file.path()), lookup(&[("ADBOOK_SECRET", "secret")]), flags)
        .unwrap()
}

#[test]
fn test_export_prints_summary_and_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(dir.path());
    assert_eq!(config.export.store, StoreKind::Csv);

    let records = vec![
        UserRecord::from_raw(Some("Ivanov Petr"), Some("petr@corp.example.com")),
        UserRecord::from_raw(Some("Meeting Room"), None),
        UserRecord::from_raw(Some("Sidorova"), Some("sidorova@corp.example.com")),
    ];
    let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new(), false, "csv");
    reporter.on_found(records.len());

    let outcome = export_records(&records, &config.export, &mut reporter).unwrap();

    let ExportOutcome::Completed(summary) = outcome else {
        panic!("expected a completed export");
    };
    let (out, err) = reporter.into_writers();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Found 3 users."));
    assert!(out.contains("Created contact store"));
    assert!(out.contains("Added 2 contacts, skipped 1 (0 failed to save)."));
    assert!(out.contains(&format!("Saved to {}", summary.store_path.display())));
    assert!(err.is_empty());

    let written = std::fs::read_to_string(&summary.store_path).unwrap();
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn test_nothing_to_save() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(dir.path());
    let mut reporter = ConsoleReporter::new(Vec::new(), Vec::new(), false, "csv");
    reporter.on_found(0);

    let outcome = export_records(&[], &config.export, &mut reporter).unwrap();

    assert_eq!(outcome, ExportOutcome::NoData);
    let (out, _) = reporter.into_writers();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Found 0 users.\nNo data to save.\n"
    );
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

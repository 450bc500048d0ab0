//! Console narration
//!
//! [`ConsoleReporter`] observes both phases. Progress goes to stdout, failure
//! diagnostics to stderr. The summary line is printed even with `--quiet`.

use std::io::{self, Stderr, Stdout, Write};
use std::path::Path;

use adbook_core::UserRecord;
use adbook_directory::{ConnectionError, FetchObserver};
use adbook_export::{ExportObserver, ExportSummary, ItemOutcome};

use crate::progress::ExportProgress;

/// Prints fetch and export progress.
pub struct ConsoleReporter<O: Write, E: Write> {
    out: O,
    err: E,
    quiet: bool,
    draw_progress: bool,
    store: String,
    progress: Option<ExportProgress>,
}

impl ConsoleReporter<Stdout, Stderr> {
    /// Reporter on the process stdout and stderr.
    pub fn stdio(quiet: bool, store: &str) -> Self {
        Self::new(io::stdout(), io::stderr(), quiet, store).with_progress_bar(!quiet)
    }
}

impl<O: Write, E: Write> ConsoleReporter<O, E> {
    /// Reporter on arbitrary writers, without a drawn progress bar.
    pub fn new(out: O, err: E, quiet: bool, store: &str) -> Self {
        Self {
            out,
            err,
            quiet,
            draw_progress: false,
            store: store.to_string(),
            progress: None,
        }
    }

    /// Draw a progress bar on stderr during the export loop.
    #[must_use]
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.draw_progress = enabled;
        self
    }

    /// The fetch returned `count` records.
    pub fn on_found(&mut self, count: usize) {
        if !self.quiet {
            let _ = writeln!(self.out, "Found {count} users.");
        }
    }

    /// Consume the reporter, returning its writers.
    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }

    fn say(&mut self, line: std::fmt::Arguments<'_>) {
        if !self.quiet {
            let _ = self.out.write_fmt(line);
            let _ = self.out.write_all(b"\n");
        }
    }
}

impl<O: Write, E: Write> FetchObserver for ConsoleReporter<O, E> {
    fn on_connecting(&mut self, url: &str, principal: &str) {
        self.say(format_args!("Connecting to {url} as {principal}..."));
    }

    fn on_connected(&mut self) {
        self.say(format_args!("Connected, searching for users..."));
    }

    fn on_failure(&mut self, _error: &ConnectionError, diagnostic: &str) {
        let _ = writeln!(self.err, "{}", diagnostic.trim_end());
    }
}

impl<O: Write, E: Write> ExportObserver for ConsoleReporter<O, E> {
    fn on_no_data(&mut self) {
        let _ = writeln!(self.out, "No data to save.");
    }

    fn on_store_created(&mut self, path: &Path) {
        self.say(format_args!("Created contact store {}", path.display()));
    }

    fn on_start(&mut self, total: usize) {
        let total = total as u64;
        self.progress = Some(if self.draw_progress {
            ExportProgress::new(total, &self.store)
        } else {
            ExportProgress::hidden(total)
        });
    }

    fn on_item_done(&mut self, _index: usize, record: &UserRecord, outcome: &ItemOutcome) {
        if let ItemOutcome::Failed(e) = outcome {
            let err = &mut self.err;
            let line = format!("Skipped {}: {}", record.mail(), e);
            match &self.progress {
                Some(progress) => progress.suspend(|| {
                    let _ = writeln!(err, "{line}");
                }),
                None => {
                    let _ = writeln!(err, "{line}");
                }
            }
        }

        if let Some(progress) = &self.progress {
            progress.inc();
        }
    }

    fn on_summary(&mut self, summary: &ExportSummary) {
        if let Some(progress) = self.progress.take() {
            progress.finish_and_clear();
        }

        let _ = writeln!(
            self.out,
            "Added {} contacts, skipped {} ({} failed to save).",
            summary.added, summary.skipped, summary.failed
        );
        if summary.written {
            let _ = writeln!(self.out, "Saved to {}", summary.store_path.display());
        } else {
            let _ = writeln!(self.out, "Dry run, nothing written.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adbook_directory::BindFailure;
    use adbook_export::ExportError;
    use std::path::PathBuf;

    fn reporter(quiet: bool) -> ConsoleReporter<Vec<u8>, Vec<u8>> {
        ConsoleReporter::new(Vec::new(), Vec::new(), quiet, "csv")
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    fn summary() -> ExportSummary {
        ExportSummary {
            total: 3,
            added: 2,
            skipped: 1,
            failed: 0,
            store_path: PathBuf::from("/tmp/contacts_20260314_092653.csv"),
            written: true,
        }
    }

    #[test]
    fn test_fetch_narration() {
        let mut r = reporter(false);
        r.on_connecting("ldap://gc:3268", "svc@corp.example.com");
        r.on_connected();
        r.on_found(3);

        let (out, _) = r.into_writers();
        let out = text(out);
        assert!(out.contains("Connecting to ldap://gc:3268 as svc@corp.example.com"));
        assert!(out.contains("Found 3 users."));
    }

    #[test]
    fn test_failure_goes_to_stderr_even_when_quiet() {
        let mut r = reporter(true);
        let error = ConnectionError::BindRejected {
            principal: "svc@corp.example.com".into(),
            reason: BindFailure::InvalidCredentials,
            rc: 49,
            text: "data 52e".into(),
        };
        r.on_failure(&error, "Failed to query the global catalog\n");

        let (out, err) = r.into_writers();
        assert!(out.is_empty());
        assert_eq!(text(err), "Failed to query the global catalog\n");
    }

    #[test]
    fn test_no_data_message() {
        let mut r = reporter(true);
        r.on_no_data();

        let (out, _) = r.into_writers();
        assert_eq!(text(out), "No data to save.\n");
    }

    #[test]
    fn test_item_failure_and_summary() {
        let mut r = reporter(false);
        let record = UserRecord::from_raw(Some("B"), Some("b@example.com"));
        r.on_start(3);
        r.on_item_done(0, &record, &ItemOutcome::NoMail);
        r.on_item_done(
            1,
            &record,
            &ItemOutcome::Failed(ExportError::item_commit("b@example.com", "disk full")),
        );
        assert_eq!(r.progress.as_ref().map(ExportProgress::position), Some(2));
        r.on_summary(&summary());

        assert!(r.progress.is_none());
        let (out, err) = r.into_writers();
        let out = text(out);
        assert!(out.contains("Added 2 contacts, skipped 1 (0 failed to save)."));
        assert!(out.contains("Saved to /tmp/contacts_20260314_092653.csv"));
        assert!(text(err).contains("Skipped b@example.com: failed to save contact b@example.com"));
    }

    #[test]
    fn test_dry_run_summary_names_no_file() {
        let mut r = reporter(false);
        r.on_summary(&ExportSummary {
            written: false,
            ..summary()
        });

        let (out, _) = r.into_writers();
        let out = text(out);
        assert!(out.contains("Added 2 contacts"));
        assert!(out.contains("Dry run, nothing written."));
        assert!(!out.contains("Saved to"));
    }

    #[test]
    fn test_quiet_still_prints_summary() {
        let mut r = reporter(true);
        r.on_store_created(Path::new("/tmp/c.csv"));
        r.on_summary(&summary());

        let (out, _) = r.into_writers();
        let out = text(out);
        assert!(!out.contains("Created contact store"));
        assert!(out.contains("Added 2 contacts"));
    }
}

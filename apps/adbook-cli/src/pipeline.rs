//! Fetch-then-export run

use tracing::info;

use adbook_core::UserRecord;
use adbook_directory::DirectoryFetcher;
use adbook_export::{
    ContactExporter, CsvContactClient, ExportObserver, ExportOutcome, MailClient, MemoryClient,
};

use crate::cli::Cli;
use crate::config::{AppConfig, ConfigError, ExportSettings, StoreKind};
use crate::error::CliResult;
use crate::logging;
use crate::reporter::ConsoleReporter;

/// Run the whole export as configured by `cli`.
pub async fn run(cli: Cli) -> CliResult<ExportOutcome> {
    let level = cli.log_level();
    logging::init_logging(level);

    let config = AppConfig::load(cli.config.as_deref(), cli.overrides())?;
    let mut reporter = ConsoleReporter::stdio(level.is_quiet(), config.export.store.name());

    let fetcher = DirectoryFetcher::new(config.directory.clone()).map_err(ConfigError::from)?;
    let records = fetcher.fetch_users(&mut reporter).await;
    reporter.on_found(records.len());

    export_records(&records, &config.export, &mut reporter)
}

/// Export `records` into the configured store.
pub fn export_records(
    records: &[UserRecord],
    settings: &ExportSettings,
    observer: &mut dyn ExportObserver,
) -> CliResult<ExportOutcome> {
    match settings.store {
        StoreKind::Csv => export_with(CsvContactClient::new(), records, settings, observer),
        StoreKind::Memory => export_with(MemoryClient::new(), records, settings, observer),
        // Starting Outlook is slow and visible; skip it when there is nothing to write.
        StoreKind::Outlook if records.is_empty() => {
            info!("No records to export");
            observer.on_no_data();
            Ok(ExportOutcome::NoData)
        }
        StoreKind::Outlook => export_outlook(records, settings, observer),
    }
}

fn export_with<C: MailClient>(
    client: C,
    records: &[UserRecord],
    settings: &ExportSettings,
    observer: &mut dyn ExportObserver,
) -> CliResult<ExportOutcome> {
    let mut exporter = ContactExporter::new(client, settings.options());
    Ok(exporter.export(records, observer)?)
}

#[cfg(windows)]
fn export_outlook(
    records: &[UserRecord],
    settings: &ExportSettings,
    observer: &mut dyn ExportObserver,
) -> CliResult<ExportOutcome> {
    use adbook_export::OutlookClient;

    let client = OutlookClient::connect()?;
    export_with(client, records, settings, observer)
}

#[cfg(not(windows))]
fn export_outlook(
    _records: &[UserRecord],
    _settings: &ExportSettings,
    _observer: &mut dyn ExportObserver,
) -> CliResult<ExportOutcome> {
    info!("Outlook store requested on a platform without COM");
    Err(crate::error::CliError::UnsupportedStore(
        StoreKind::Outlook.to_string(),
    ))
}

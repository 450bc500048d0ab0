//! User fetch
//!
//! [`DirectoryFetcher`] runs the fetch sequence: connect, bind, one paged
//! subtree search, unbind. Unbind happens on every path once a session is
//! open.

use tracing::{debug, error, info, instrument, warn};

use adbook_core::UserRecord;

use crate::config::GlobalCatalogConfig;
use crate::error::{ConnectionError, FetchResult};
use crate::session::{DirectoryEntry, DirectorySession, LdapSession, SearchRequest};

/// Display name attribute.
pub const NAME_ATTRIBUTE: &str = "name";

/// Mail address attribute.
pub const MAIL_ATTRIBUTE: &str = "mail";

/// Receives fetch milestones for console narration.
pub trait FetchObserver {
    /// About to bind as `principal`.
    fn on_connecting(&mut self, _url: &str, _principal: &str) {}

    /// Bind succeeded.
    fn on_connected(&mut self) {}

    /// The fetch failed; `diagnostic` is the full report with hints.
    fn on_failure(&mut self, _error: &ConnectionError, _diagnostic: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentFetch;

impl FetchObserver for SilentFetch {}

/// Fetches user records from a Global Catalog.
#[derive(Debug, Clone)]
pub struct DirectoryFetcher {
    config: GlobalCatalogConfig,
}

impl DirectoryFetcher {
    /// Create a fetcher, validating the configuration.
    pub fn new(config: GlobalCatalogConfig) -> FetchResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this fetcher uses.
    #[must_use]
    pub fn config(&self) -> &GlobalCatalogConfig {
        &self.config
    }

    /// Fetch users, reporting any failure and returning no records instead.
    pub async fn fetch_users(&self, observer: &mut dyn FetchObserver) -> Vec<UserRecord> {
        observer.on_connecting(&self.config.url(), &self.config.principal());
        let result = match LdapSession::connect(&self.config).await {
            Ok(mut session) => self.run(&mut session, observer).await,
            Err(e) => Err(e),
        };
        self.report(result, observer)
    }

    /// Fetch users over an already opened session, reporting any failure.
    pub async fn fetch_users_with<S>(
        &self,
        session: &mut S,
        observer: &mut dyn FetchObserver,
    ) -> Vec<UserRecord>
    where
        S: DirectorySession + ?Sized,
    {
        observer.on_connecting(&self.config.url(), &self.config.principal());
        let result = self.run(session, observer).await;
        self.report(result, observer)
    }

    /// Fetch users, returning the raw error on failure.
    pub async fn try_fetch_users(&self) -> FetchResult<Vec<UserRecord>> {
        let mut session = LdapSession::connect(&self.config).await?;
        self.run(&mut session, &mut SilentFetch).await
    }

    /// Bind and search, then unbind whatever the outcome.
    #[instrument(skip(self, session, observer), fields(url = %self.config.url()))]
    pub async fn run<S>(
        &self,
        session: &mut S,
        observer: &mut dyn FetchObserver,
    ) -> FetchResult<Vec<UserRecord>>
    where
        S: DirectorySession + ?Sized,
    {
        let result = self.bind_and_search(session, observer).await;

        if let Err(e) = session.unbind().await {
            warn!(error = %e, "Error during LDAP unbind");
        } else {
            debug!("LDAP session released");
        }

        result
    }

    async fn bind_and_search<S>(
        &self,
        session: &mut S,
        observer: &mut dyn FetchObserver,
    ) -> FetchResult<Vec<UserRecord>>
    where
        S: DirectorySession + ?Sized,
    {
        let principal = self.config.principal();
        let password = self.config.password.as_deref().unwrap_or_default();

        session.bind(&principal, password).await?;
        observer.on_connected();

        let request = SearchRequest::from_config(&self.config);
        let entries = session.search(&request).await?;

        let records: Vec<UserRecord> = entries.iter().map(entry_to_record).collect();

        info!(users = records.len(), "Fetched users from global catalog");
        Ok(records)
    }

    fn report(
        &self,
        result: FetchResult<Vec<UserRecord>>,
        observer: &mut dyn FetchObserver,
    ) -> Vec<UserRecord> {
        match result {
            Ok(records) => records,
            Err(e) => {
                let diagnostic = e.diagnostic(&self.config.username, &self.config.principal());
                error!(
                    error = %e,
                    code = e.error_code(),
                    principal = %self.config.principal(),
                    "Global catalog fetch failed"
                );
                observer.on_failure(&e, &diagnostic);
                Vec::new()
            }
        }
    }
}

/// Map a search entry to a cleaned record.
#[must_use]
pub fn entry_to_record(entry: &DirectoryEntry) -> UserRecord {
    UserRecord::from_raw(entry.first(NAME_ATTRIBUTE), entry.first(MAIL_ATTRIBUTE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Scripted session recording every call.
    #[derive(Default)]
    struct FakeSession {
        calls: Vec<String>,
        bind_error: Option<(u32, String)>,
        search_error: bool,
        entries: Vec<DirectoryEntry>,
        last_request: Option<SearchRequest>,
    }

    #[async_trait]
    impl DirectorySession for FakeSession {
        async fn bind(&mut self, principal: &str, _password: &str) -> FetchResult<()> {
            self.calls.push(format!("bind {principal}"));
            match &self.bind_error {
                Some((rc, text)) => Err(ConnectionError::bind_rejected(principal, *rc, text)),
                None => Ok(()),
            }
        }

        async fn search(&mut self, request: &SearchRequest) -> FetchResult<Vec<DirectoryEntry>> {
            self.calls.push("search".to_string());
            self.last_request = Some(request.clone());
            if self.search_error {
                return Err(ConnectionError::search_failed("size limit exceeded"));
            }
            Ok(self.entries.clone())
        }

        async fn unbind(&mut self) -> FetchResult<()> {
            self.calls.push("unbind".to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        connected: bool,
        failures: Vec<String>,
    }

    impl FetchObserver for RecordingObserver {
        fn on_connected(&mut self) {
            self.connected = true;
        }

        fn on_failure(&mut self, error: &ConnectionError, diagnostic: &str) {
            self.failures.push(format!("{}|{}", error.error_code(), diagnostic));
        }
    }

    fn fetcher() -> DirectoryFetcher {
        DirectoryFetcher::new(
            GlobalCatalogConfig::new("gc.corp.example.com", "svc-export", "corp.example.com")
                .with_password("secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = GlobalCatalogConfig::new("", "svc", "corp.example.com");
        assert!(DirectoryFetcher::new(config).is_err());
    }

    #[test]
    fn test_entry_to_record_missing_attributes() {
        let record = entry_to_record(&DirectoryEntry::new("CN=nobody"));
        assert_eq!(record.name(), "");
        assert_eq!(record.mail(), "");
    }

    #[test]
    fn test_entry_to_record_cleans_values() {
        let entry = DirectoryEntry::new("CN=x")
            .with("name", "Ivanov,\r\nPetr ")
            .with("mail", " petr@corp.example.com");
        let record = entry_to_record(&entry);

        assert_eq!(record.name(), "\"Ivanov, Petr\"");
        assert_eq!(record.mail(), "petr@corp.example.com");
    }

    #[tokio::test]
    async fn test_fetch_keeps_server_order_and_unbinds() {
        let mut session = FakeSession {
            entries: vec![
                DirectoryEntry::new("CN=b")
                    .with("name", "Petrov Ivan")
                    .with("mail", "ivan@corp.example.com"),
                DirectoryEntry::new("CN=a").with("name", "Sidorov"),
                DirectoryEntry::new("CN=c").with("mail", "c@corp.example.com"),
            ],
            ..Default::default()
        };
        let mut observer = RecordingObserver::default();

        let records = fetcher().fetch_users_with(&mut session, &mut observer).await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name(), "Petrov Ivan");
        assert_eq!(records[1].mail(), "");
        assert_eq!(records[2].name(), "");
        assert_eq!(
            session.calls,
            vec!["bind svc-export@corp.example.com", "search", "unbind"]
        );
        assert!(observer.connected);
        assert!(observer.failures.is_empty());

        let request = session.last_request.unwrap();
        assert_eq!(request.base_dn, "");
        assert_eq!(request.page_size, 1000);
    }

    #[tokio::test]
    async fn test_fetch_zero_results_is_not_an_error() {
        let mut session = FakeSession::default();
        let mut observer = RecordingObserver::default();

        let records = fetcher().fetch_users_with(&mut session, &mut observer).await;

        assert!(records.is_empty());
        assert!(observer.failures.is_empty());
    }

    #[tokio::test]
    async fn test_bind_failure_reports_and_unbinds() {
        let mut session = FakeSession {
            bind_error: Some((49, "AcceptSecurityContext error, data 775, v4563".to_string())),
            ..Default::default()
        };
        let mut observer = RecordingObserver::default();

        let records = fetcher().fetch_users_with(&mut session, &mut observer).await;

        assert!(records.is_empty());
        assert_eq!(
            session.calls,
            vec!["bind svc-export@corp.example.com", "unbind"]
        );
        assert!(!observer.connected);
        assert_eq!(observer.failures.len(), 1);
        assert!(observer.failures[0].starts_with("ACCOUNT_LOCKED|"));
        assert!(observer.failures[0].contains("svc-export@corp.example.com"));
    }

    #[tokio::test]
    async fn test_search_failure_unbinds_and_returns_error() {
        let mut session = FakeSession {
            search_error: true,
            ..Default::default()
        };

        let result = fetcher().run(&mut session, &mut SilentFetch).await;

        assert!(matches!(result, Err(ConnectionError::SearchFailed { .. })));
        assert_eq!(session.calls.last().map(String::as_str), Some("unbind"));
    }
}

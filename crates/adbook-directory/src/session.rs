//! Directory sessions
//!
//! [`DirectorySession`] is the seam between the fetch sequence and the LDAP
//! protocol. [`LdapSession`] implements it over `ldap3`.

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GlobalCatalogConfig;
use crate::error::{ConnectionError, FetchResult};

/// Parameters of the single search a fetch performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search base DN; empty for catalog-wide.
    pub base_dn: String,
    /// LDAP filter.
    pub filter: String,
    /// Requested attributes.
    pub attributes: Vec<String>,
    /// Page size hint for the paged results control.
    pub page_size: i32,
}

impl SearchRequest {
    /// Build the request described by a configuration.
    #[must_use]
    pub fn from_config(config: &GlobalCatalogConfig) -> Self {
        Self {
            base_dn: config.base_dn.clone(),
            filter: config.filter.clone(),
            attributes: config.attributes.clone(),
            page_size: i32::try_from(config.page_size).unwrap_or(i32::MAX),
        }
    }
}

/// One entry returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute values keyed by attribute name.
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Add an attribute value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.entry(name.into()).or_default().push(value.into());
        self
    }

    /// First value of an attribute, matching the name case-insensitively.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

impl From<SearchEntry> for DirectoryEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
        }
    }
}

/// An authenticated conversation with a directory server.
#[async_trait]
pub trait DirectorySession: Send {
    /// Authenticate with a simple bind.
    async fn bind(&mut self, principal: &str, password: &str) -> FetchResult<()>;

    /// Run one subtree search and collect every entry, following pages.
    async fn search(&mut self, request: &SearchRequest) -> FetchResult<Vec<DirectoryEntry>>;

    /// Release the session.
    async fn unbind(&mut self) -> FetchResult<()>;
}

/// [`DirectorySession`] over an `ldap3` connection.
pub struct LdapSession {
    ldap: Ldap,
    url: String,
}

impl LdapSession {
    /// Open a connection to the configured server.
    ///
    /// The connection driver runs on a spawned task that ends when the
    /// session is unbound.
    pub async fn connect(config: &GlobalCatalogConfig) -> FetchResult<Self> {
        let url = config.url();

        debug!(url = %url, "Connecting to global catalog");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.connect_timeout_secs));

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| ConnectionError::ConnectFailed {
                url: url.clone(),
                source: Box::new(e),
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        Ok(Self { ldap, url })
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn bind(&mut self, principal: &str, password: &str) -> FetchResult<()> {
        debug!(principal = %principal, "Performing LDAP bind");

        let result = self
            .ldap
            .simple_bind(principal, password)
            .await
            .map_err(|e| ConnectionError::BindFailed {
                principal: principal.to_string(),
                source: Box::new(e),
            })?;

        if result.rc != 0 {
            return Err(ConnectionError::bind_rejected(
                principal,
                result.rc,
                result.text,
            ));
        }

        info!(url = %self.url, principal = %principal, "Bound to global catalog");
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> FetchResult<Vec<DirectoryEntry>> {
        debug!(
            filter = %request.filter,
            base_dn = %request.base_dn,
            page_size = request.page_size,
            "Searching global catalog"
        );

        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(request.page_size)),
        ];
        let attrs: Vec<&str> = request.attributes.iter().map(String::as_str).collect();

        let mut stream = self
            .ldap
            .streaming_search_with(
                adapters,
                &request.base_dn,
                Scope::Subtree,
                &request.filter,
                attrs,
            )
            .await
            .map_err(|e| ConnectionError::search_failed_with_source("search request failed", e))?;

        let mut entries = Vec::new();
        while let Some(entry) = stream
            .next()
            .await
            .map_err(|e| ConnectionError::search_failed_with_source("reading results failed", e))?
        {
            entries.push(DirectoryEntry::from(SearchEntry::construct(entry)));
        }

        stream.finish().await.success().map_err(|e| {
            ConnectionError::search_failed_with_source("search did not complete", e)
        })?;

        info!(total_found = entries.len(), "Global catalog search completed");
        Ok(entries)
    }

    async fn unbind(&mut self) -> FetchResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| ConnectionError::search_failed_with_source("unbind failed", e))
    }
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession").field("url", &self.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_from_config() {
        let config =
            GlobalCatalogConfig::new("gc.corp.example.com", "svc", "corp.example.com")
                .with_base_dn("DC=corp,DC=example,DC=com");
        let request = SearchRequest::from_config(&config);

        assert_eq!(request.base_dn, "DC=corp,DC=example,DC=com");
        assert_eq!(
            request.filter,
            "(&(objectCategory=person)(objectClass=user)(mail=*))"
        );
        assert_eq!(request.attributes, vec!["name", "mail"]);
        assert_eq!(request.page_size, 1000);
    }

    #[test]
    fn test_search_request_clamps_page_size() {
        let mut config = GlobalCatalogConfig::new("gc.corp.example.com", "svc", "corp");
        config.page_size = u32::MAX;
        assert_eq!(SearchRequest::from_config(&config).page_size, i32::MAX);
    }

    #[test]
    fn test_entry_first_is_case_insensitive() {
        let entry = DirectoryEntry::new("CN=Ivanov Petr,OU=Users,DC=corp")
            .with("Name", "Ivanov Petr")
            .with("mail", "petr@corp.example.com");

        assert_eq!(entry.first("name"), Some("Ivanov Petr"));
        assert_eq!(entry.first("MAIL"), Some("petr@corp.example.com"));
        assert_eq!(entry.first("telephoneNumber"), None);
    }

    #[test]
    fn test_entry_first_of_multi_valued() {
        let entry = DirectoryEntry::new("CN=x")
            .with("mail", "first@corp.example.com")
            .with("mail", "second@corp.example.com");

        assert_eq!(entry.first("mail"), Some("first@corp.example.com"));
    }

    #[test]
    fn test_entry_from_search_entry() {
        let mut attrs = HashMap::new();
        attrs.insert("mail".to_string(), vec!["a@b.com".to_string()]);
        let search_entry = SearchEntry {
            dn: "CN=a".to_string(),
            attrs,
            bin_attrs: HashMap::new(),
        };

        let entry = DirectoryEntry::from(search_entry);
        assert_eq!(entry.dn, "CN=a");
        assert_eq!(entry.first("mail"), Some("a@b.com"));
    }
}

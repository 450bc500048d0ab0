//! Global Catalog configuration
//!
//! Connection and search parameters for the user fetch.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectionError, FetchResult};

/// Configuration for querying an Active Directory Global Catalog.
#[derive(Clone, Serialize, Deserialize)]
pub struct GlobalCatalogConfig {
    /// Global Catalog hostname or IP address.
    pub host: String,

    /// Global Catalog port (3268 plain, 3269 over TLS).
    #[serde(default = "default_gc_port")]
    pub port: u16,

    /// Connect over TLS (`ldaps://`).
    #[serde(default)]
    pub use_tls: bool,

    /// Search base DN. Empty searches the whole catalog.
    #[serde(default)]
    pub base_dn: String,

    /// Account name, either bare (`svc-export`) or already qualified.
    pub username: String,

    /// Domain appended to a bare account name (e.g., "corp.example.com").
    #[serde(default)]
    pub domain: String,

    /// Bind password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// LDAP filter selecting the users to export.
    #[serde(default = "default_user_filter")]
    pub filter: String,

    /// Attributes requested for each entry.
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Page size hint for the paged results control.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for GlobalCatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCatalogConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_tls", &self.use_tls)
            .field("base_dn", &self.base_dn)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("password", &self.password.as_ref().map(|_| "***REDACTED***"))
            .field("filter", &self.filter)
            .field("attributes", &self.attributes)
            .field("page_size", &self.page_size)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Plain Global Catalog port.
pub const GC_PORT: u16 = 3268;

/// Global Catalog port over TLS.
pub const GC_TLS_PORT: u16 = 3269;

fn default_gc_port() -> u16 {
    GC_PORT
}

fn default_user_filter() -> String {
    "(&(objectCategory=person)(objectClass=user)(mail=*))".to_string()
}

fn default_attributes() -> Vec<String> {
    vec!["name".to_string(), "mail".to_string()]
}

fn default_page_size() -> u32 {
    1000
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl GlobalCatalogConfig {
    /// Create a new config with required fields.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_gc_port(),
            use_tls: false,
            base_dn: String::new(),
            username: username.into(),
            domain: domain.into(),
            password: None,
            filter: default_user_filter(),
            attributes: default_attributes(),
            page_size: default_page_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Set bind password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enable TLS on the Global Catalog TLS port.
    #[must_use]
    pub fn with_tls(mut self) -> Self {
        self.use_tls = true;
        self.port = GC_TLS_PORT;
        self
    }

    /// Set search base DN.
    pub fn with_base_dn(mut self, base_dn: impl Into<String>) -> Self {
        self.base_dn = base_dn.into();
        self
    }

    /// Set search filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// The principal sent in the bind request.
    ///
    /// A bare account name is qualified as `user@domain`. Names that are
    /// already a UPN (`@`), a down-level logon name (`\`) or a DN (`=`) are
    /// used as given.
    #[must_use]
    pub fn principal(&self) -> String {
        let user = self.username.trim();
        if user.contains(['@', '\\', '=']) || self.domain.trim().is_empty() {
            user.to_string()
        } else {
            format!("{}@{}", user, self.domain.trim())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> FetchResult<()> {
        if self.host.trim().is_empty() {
            return Err(invalid("host is required"));
        }

        if self.port == 0 {
            return Err(invalid("port must be between 1 and 65535"));
        }

        let user = self.username.trim();
        if user.is_empty() {
            return Err(invalid("username is required"));
        }

        if !user.contains(['@', '\\', '=']) && self.domain.trim().is_empty() {
            return Err(invalid(
                "domain is required unless username is a UPN, DOMAIN\\user or a DN",
            ));
        }

        // An empty password turns a simple bind into an anonymous one.
        if self.password.as_deref().map_or(true, str::is_empty) {
            return Err(invalid("password is required"));
        }

        let filter = self.filter.trim();
        if !(filter.starts_with('(') && filter.ends_with(')')) {
            return Err(invalid(format!(
                "filter must be enclosed in parentheses, got '{}'",
                self.filter
            )));
        }

        if self.attributes.is_empty() {
            return Err(invalid("at least one attribute is required"));
        }

        if self.page_size == 0 || i32::try_from(self.page_size).is_err() {
            return Err(invalid(format!(
                "page_size must be between 1 and {}, got {}",
                i32::MAX,
                self.page_size
            )));
        }

        Ok(())
    }

    /// Copy of the config with the password masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.password.is_some() {
            config.password = Some("***REDACTED***".to_string());
        }
        config
    }
}

fn invalid(message: impl Into<String>) -> ConnectionError {
    ConnectionError::InvalidConfiguration {
        message: message.into(),
    }
}

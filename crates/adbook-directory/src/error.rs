//! Directory fetch error types
//!
//! Every failure of the fetch phase is a [`ConnectionError`]. Bind failures
//! are classified from the LDAP result code and the Active Directory
//! diagnostic data code so the report can name a likely cause.

use thiserror::Error;

/// LDAP result code: invalidDNSyntax.
const RC_INVALID_DN_SYNTAX: u32 = 34;
/// LDAP result code: invalidCredentials.
const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: insufficientAccessRights.
const RC_INSUFFICIENT_ACCESS: u32 = 50;

/// Causes listed when the failure does not point at a single one.
const GENERIC_CAUSES: &[&str] = &[
    "Invalid credentials (user name or password)",
    "The account is locked or the password has expired",
    "No access rights to the global catalog",
    "Wrong user name format",
];

/// Why a bind was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindFailure {
    /// Wrong user name or password.
    InvalidCredentials,
    /// Account disabled or locked out.
    AccountLocked,
    /// Password or account expired, or a password reset is pending.
    CredentialsExpired,
    /// The account may not log on (time or workstation restriction, rights).
    InsufficientPrivilege,
    /// The principal could not be parsed by the server.
    MalformedPrincipal,
    /// Anything else the server reported.
    Other,
}

impl BindFailure {
    /// Classify a failed bind from its result code and diagnostic text.
    ///
    /// Active Directory appends `data <code>` to the diagnostic message of an
    /// invalidCredentials result, e.g. `... data 775, v4563`.
    #[must_use]
    pub fn classify(rc: u32, text: &str) -> Self {
        match rc {
            RC_INVALID_CREDENTIALS => match ad_data_code(text).as_deref() {
                Some("533" | "775") => Self::AccountLocked,
                Some("532" | "701" | "773") => Self::CredentialsExpired,
                Some("530" | "531") => Self::InsufficientPrivilege,
                _ => Self::InvalidCredentials,
            },
            RC_INSUFFICIENT_ACCESS => Self::InsufficientPrivilege,
            RC_INVALID_DN_SYNTAX => Self::MalformedPrincipal,
            _ => Self::Other,
        }
    }

    /// Short human-readable description.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid user name or password",
            Self::AccountLocked => "account is disabled or locked out",
            Self::CredentialsExpired => "password or account has expired",
            Self::InsufficientPrivilege => "account is not permitted to access the global catalog",
            Self::MalformedPrincipal => "user name format was not accepted",
            Self::Other => "server rejected the bind",
        }
    }
}

/// Extract the hex data code from an AD bind diagnostic message.
fn ad_data_code(text: &str) -> Option<String> {
    let rest = &text[text.find("data ")? + "data ".len()..];
    let code: String = rest
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect::<String>()
        .to_ascii_lowercase();
    (!code.is_empty()).then_some(code)
}

/// Error that can occur while fetching users from the directory.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Could not open a connection to the server.
    #[error("failed to connect to {url}")]
    ConnectFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server rejected the bind.
    #[error("bind failed for {principal}: {} (code {rc}: {text})", .reason.describe())]
    BindRejected {
        principal: String,
        reason: BindFailure,
        rc: u32,
        text: String,
    },

    /// The bind request itself could not be completed.
    #[error("bind failed for {principal}")]
    BindFailed {
        principal: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The search failed or was cut off.
    #[error("search failed: {message}")]
    SearchFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectionError {
    /// Create a bind rejection from an LDAP result.
    pub fn bind_rejected(principal: impl Into<String>, rc: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        ConnectionError::BindRejected {
            principal: principal.into(),
            reason: BindFailure::classify(rc, &text),
            rc,
            text,
        }
    }

    /// Create a search failure without a source.
    pub fn search_failed(message: impl Into<String>) -> Self {
        ConnectionError::SearchFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a search failure with source.
    pub fn search_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectionError::SearchFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectionError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectionError::ConnectFailed { .. } => "CONNECTION_FAILED",
            ConnectionError::BindRejected { reason, .. } => match reason {
                BindFailure::InvalidCredentials => "AUTH_FAILED",
                BindFailure::AccountLocked => "ACCOUNT_LOCKED",
                BindFailure::CredentialsExpired => "CREDENTIALS_EXPIRED",
                BindFailure::InsufficientPrivilege => "AUTHORIZATION_FAILED",
                BindFailure::MalformedPrincipal => "INVALID_PRINCIPAL",
                BindFailure::Other => "BIND_REJECTED",
            },
            ConnectionError::BindFailed { .. } => "BIND_FAILED",
            ConnectionError::SearchFailed { .. } => "SEARCH_FAILED",
        }
    }

    /// Multi-line report of the failure with likely causes and remedies.
    ///
    /// `principal` is the account name as entered, `upn` the qualified form
    /// that was sent to the server.
    #[must_use]
    pub fn diagnostic(&self, principal: &str, upn: &str) -> String {
        let mut out = format!("Failed to query the global catalog: {self}\n");

        out.push_str("\nPossible causes:\n");
        let causes: &[&str] = match self {
            ConnectionError::BindRejected { reason, .. } => match reason {
                BindFailure::InvalidCredentials => &["Invalid credentials (user name or password)"],
                BindFailure::AccountLocked => &["The account is locked or disabled"],
                BindFailure::CredentialsExpired => &["The password or the account has expired"],
                BindFailure::InsufficientPrivilege => &["No access rights to the global catalog"],
                BindFailure::MalformedPrincipal => &["Wrong user name format"],
                BindFailure::Other => GENERIC_CAUSES,
            },
            ConnectionError::ConnectFailed { .. } => &[
                "The server name or port is wrong",
                "The global catalog is unreachable from this host",
            ],
            ConnectionError::InvalidConfiguration { .. } => &["The configuration is incomplete"],
            ConnectionError::BindFailed { .. } | ConnectionError::SearchFailed { .. } => {
                GENERIC_CAUSES
            }
        };
        for (i, cause) in causes.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, cause));
        }

        out.push_str("\nTry:\n");
        out.push_str("  - Check the credentials\n");
        out.push_str(&format!("  - Use the full UPN format: {upn}\n"));
        out.push_str("  - Or use the full DN of the user");
        if principal != upn {
            out.push_str(&format!(" instead of '{principal}'"));
        }
        out.push('\n');

        out
    }
}

/// Result type for directory fetch operations.
pub type FetchResult<T> = Result<T, ConnectionError>;

//! # Directory Fetch
//!
//! Reads user records (display name and mail) from an Active Directory
//! Global Catalog.
//!
//! ## Features
//!
//! - LDAP v3 simple bind with a UPN principal
//! - One subtree search with the paged results control
//! - Bind failure classification from AD diagnostic codes
//! - Failures reported with remediation hints, never propagated past
//!   [`DirectoryFetcher::fetch_users`]
//!
//! ## Example
//!
//! ```ignore
//! use adbook_directory::{DirectoryFetcher, GlobalCatalogConfig, SilentFetch};
//!
//! let config = GlobalCatalogConfig::new("gc.corp.example.com", "svc-export", "corp.example.com")
//!     .with_password("secret");
//!
//! let fetcher = DirectoryFetcher::new(config)?;
//! let users = fetcher.fetch_users(&mut SilentFetch).await;
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod session;

// Re-exports
pub use config::GlobalCatalogConfig;
pub use error::{BindFailure, ConnectionError, FetchResult};
pub use fetcher::{DirectoryFetcher, FetchObserver, SilentFetch};
pub use session::{DirectoryEntry, DirectorySession, LdapSession, SearchRequest};

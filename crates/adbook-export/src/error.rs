//! Contact export error types
//!
//! Errors split into two classes: store-level failures abort the export,
//! item-level failures are counted and the batch continues.

use std::path::PathBuf;
use thiserror::Error;

/// Error that can occur during a contact export.
#[derive(Debug, Error)]
pub enum ExportError {
    // Store-level errors (abort the export)
    /// The mail client could not be started or reached.
    #[error("mail client unavailable: {message}")]
    ClientUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The contact store could not be created or attached.
    #[error("failed to create contact store {}: {message}", .path.display())]
    StoreCreation {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A store file from an earlier run already exists at the generated path.
    #[error("contact store already exists: {}", .path.display())]
    StoreExists { path: PathBuf },

    /// The store has no usable contacts folder.
    #[error("contacts folder not available: {message}")]
    FolderUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The output directory could not be prepared.
    #[error("output directory {} is not usable", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Item-level errors (counted as skipped)
    /// A single contact could not be saved.
    #[error("failed to save contact {address}: {message}")]
    ItemCommit {
        address: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Teardown errors (logged only)
    /// The store could not be detached from the client session.
    #[error("failed to detach contact store: {message}")]
    Detach {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ExportError {
    /// Whether this error only affects one contact.
    pub fn is_item_level(&self) -> bool {
        matches!(self, ExportError::ItemCommit { .. })
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::ClientUnavailable { .. } => "CLIENT_UNAVAILABLE",
            ExportError::StoreCreation { .. } => "STORE_CREATION_FAILED",
            ExportError::StoreExists { .. } => "STORE_EXISTS",
            ExportError::FolderUnavailable { .. } => "FOLDER_UNAVAILABLE",
            ExportError::OutputDirectory { .. } => "OUTPUT_DIRECTORY",
            ExportError::ItemCommit { .. } => "ITEM_COMMIT_FAILED",
            ExportError::Detach { .. } => "DETACH_FAILED",
        }
    }

    // Convenience constructors

    /// Create a client unavailable error.
    pub fn client_unavailable(message: impl Into<String>) -> Self {
        ExportError::ClientUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a store creation error.
    pub fn store_creation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ExportError::StoreCreation {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a store creation error with source.
    pub fn store_creation_with_source(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ExportError::StoreCreation {
            path: path.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a folder unavailable error.
    pub fn folder_unavailable(message: impl Into<String>) -> Self {
        ExportError::FolderUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create an item commit error.
    pub fn item_commit(address: impl Into<String>, message: impl Into<String>) -> Self {
        ExportError::ItemCommit {
            address: address.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an item commit error with source.
    pub fn item_commit_with_source(
        address: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ExportError::ItemCommit {
            address: address.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a detach error.
    pub fn detach(message: impl Into<String>) -> Self {
        ExportError::Detach {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

//! adbook Core Library
//!
//! Shared domain types for the directory-to-contact-store export.
//!
//! # Modules
//!
//! - [`record`] - The flat user record produced by the directory fetch, and
//!   the string cleaning rule applied to every fetched value
//! - [`contact`] - Contact fields derived from a record (name decomposition)
//!   and the identifier a mail client hands back for a saved contact
//!
//! # Example
//!
//! ```
//! use adbook_core::{ContactFields, UserRecord};
//!
//! let record = UserRecord::from_raw(Some("Ivanov Petr"), Some("petr@example.com"));
//! let fields = ContactFields::from_record(&record).expect("record has a mail address");
//!
//! assert_eq!(fields.last_name.as_deref(), Some("Ivanov"));
//! assert_eq!(fields.first_name.as_deref(), Some("Petr"));
//! assert_eq!(fields.full_name, "Ivanov Petr");
//! ```

pub mod contact;
pub mod record;

pub use contact::{ContactFields, ContactId, NameParts};
pub use record::{clean_value, UserRecord};

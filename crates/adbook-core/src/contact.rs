//! Contact fields
//!
//! How a [`UserRecord`] maps onto the fields of a mail-client contact item.
//! Directory display names here list the surname first, so a two-part name
//! is read as `"<last> <first>"`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::UserRecord;

/// Identifier a mail client returns for a saved contact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(String);

impl ContactId {
    /// Create a ContactId from a client-provided identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of splitting a display name on its first whitespace run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameParts<'a> {
    /// No name at all.
    Empty,
    /// A single token, used as the last name.
    Single(&'a str),
    /// Surname followed by the rest of the name.
    Pair { last: &'a str, first: &'a str },
}

impl<'a> NameParts<'a> {
    /// Split a name into at most two parts.
    #[must_use]
    pub fn split(name: &'a str) -> Self {
        let name = name.trim();
        if name.is_empty() {
            return Self::Empty;
        }

        match name.split_once(char::is_whitespace) {
            Some((last, rest)) => Self::Pair {
                last,
                first: rest.trim_start(),
            },
            None => Self::Single(name),
        }
    }
}

/// Field values for one contact item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    /// Primary email address (`Email1Address`).
    pub email_address: String,

    /// Display label of the primary email (`Email1DisplayName`).
    pub email_display_name: String,

    /// Given name (`FirstName`), unset unless the name has two parts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Surname (`LastName`), unset when the record has no name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Combined name (`FullName`); falls back to the mail address.
    pub full_name: String,
}

impl ContactFields {
    /// Derive contact fields from a record.
    ///
    /// Returns `None` when the record has no mail address; such records are
    /// never written to a contact store.
    #[must_use]
    pub fn from_record(record: &UserRecord) -> Option<Self> {
        if !record.has_mail() {
            return None;
        }
        let mail = record.mail().trim();

        let name = record.name().trim();
        let (last_name, first_name, full_name) = match NameParts::split(name) {
            NameParts::Empty => (None, None, mail.to_string()),
            NameParts::Single(token) => {
                (Some(token.to_string()), None, token.to_string())
            }
            NameParts::Pair { last, first } => (
                Some(last.to_string()),
                Some(first.to_string()),
                name.to_string(),
            ),
        };

        Some(Self {
            email_address: mail.to_string(),
            email_display_name: mail.to_string(),
            first_name,
            last_name,
            full_name,
        })
    }
}

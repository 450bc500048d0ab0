//! User records
//!
//! A [`UserRecord`] is the only entity that crosses from the directory fetch
//! into the contact export. Both fields are cleaned on construction and never
//! change afterwards.

use serde::{Deserialize, Serialize};

/// A user as returned by the directory: display name and mail address.
///
/// Either field may be empty. Absent directory attributes become empty
/// strings, never `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    name: String,
    mail: String,
}

impl UserRecord {
    /// Build a record from raw directory values, cleaning both.
    #[must_use]
    pub fn from_raw(name: Option<&str>, mail: Option<&str>) -> Self {
        Self {
            name: clean_value(name),
            mail: clean_value(mail),
        }
    }

    /// Cleaned display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cleaned mail address.
    #[must_use]
    pub fn mail(&self) -> &str {
        &self.mail
    }

    /// Whether the record carries a mail address worth exporting.
    #[must_use]
    pub fn has_mail(&self) -> bool {
        !self.mail.trim().is_empty()
    }
}

/// Clean a directory value so it is single-line and field-safe.
///
/// Runs of CR/LF become a single space and the result is trimmed. A value
/// containing a comma or a double quote is then quoted CSV-style: internal
/// quotes are doubled and the whole value is wrapped in quotes.
#[must_use]
pub fn clean_value(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    let mut single_line = String::with_capacity(value.len());
    let mut in_break = false;
    for c in value.chars() {
        if c == '\r' || c == '\n' {
            if !in_break {
                single_line.push(' ');
                in_break = true;
            }
        } else {
            single_line.push(c);
            in_break = false;
        }
    }

    let trimmed = single_line.trim();
    if trimmed.contains(',') || trimmed.contains('"') {
        format!("\"{}\"", trimmed.replace('"', "\"\""))
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_value_none_is_empty() {
        assert_eq!(clean_value(None), "");
    }

    #[test]
    fn test_clean_value_trims() {
        assert_eq!(clean_value(Some("  Ivanov Petr \t")), "Ivanov Petr");
    }

    #[test]
    fn test_clean_value_collapses_line_breaks() {
        assert_eq!(clean_value(Some("Ivanov\r\n\r\nPetr")), "Ivanov Petr");
        assert_eq!(clean_value(Some("a\nb\rc")), "a b c");
    }

    #[test]
    fn test_clean_value_line_break_at_edges_is_trimmed() {
        assert_eq!(clean_value(Some("\r\nIvanov\n")), "Ivanov");
    }

    #[test]
    fn test_clean_value_quotes_comma() {
        assert_eq!(clean_value(Some("Ivanov, Petr")), "\"Ivanov, Petr\"");
    }

    #[test]
    fn test_clean_value_doubles_quotes() {
        assert_eq!(
            clean_value(Some("Petr \"The Great\" Ivanov")),
            "\"Petr \"\"The Great\"\" Ivanov\""
        );
    }

    #[test]
    fn test_clean_value_quotes_after_trim() {
        assert_eq!(clean_value(Some("  a,b\n")), "\"a,b\"");
    }

    #[test]
    fn test_clean_value_keeps_non_ascii() {
        assert_eq!(clean_value(Some(" Иванов Пётр ")), "Иванов Пётр");
    }

    #[test]
    fn test_record_from_raw_missing_attributes() {
        let record = UserRecord::from_raw(None, None);
        assert_eq!(record.name(), "");
        assert_eq!(record.mail(), "");
        assert!(!record.has_mail());
    }

    #[test]
    fn test_record_has_mail() {
        let record = UserRecord::from_raw(Some("Ivanov"), Some(" ivanov@example.com "));
        assert_eq!(record.mail(), "ivanov@example.com");
        assert!(record.has_mail());
    }

    #[test]
    fn test_record_serialization() {
        let record = UserRecord::from_raw(Some("Ivanov Petr"), Some("petr@example.com"));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Ivanov Petr","mail":"petr@example.com"}"#);
    }
}

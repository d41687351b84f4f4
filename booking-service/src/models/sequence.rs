//! Year-scoped document numbering for quotes and invoices.
//!
//! Numbers take the form `PREFIX-YYYY-NNNN` (e.g. `QT-2025-0001`); the
//! counter restarts at 1 each calendar year.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    Quote,
    Invoice,
}

impl SequenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::Quote => "quote",
            SequenceKind::Invoice => "invoice",
        }
    }

    pub fn default_prefix(&self) -> &'static str {
        match self {
            SequenceKind::Quote => "QT",
            SequenceKind::Invoice => "INV",
        }
    }
}

/// Persisted counter state for one document kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceCounter {
    pub year: i32,
    pub counter: u32,
    pub prefix: String,
}

/// A parsed document number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNumber {
    pub prefix: String,
    pub year: i32,
    pub sequence: u32,
}

impl DocumentNumber {
    /// Parse `PREFIX-YYYY-NNNN`; prefix is one or more uppercase letters,
    /// year and sequence are exactly four digits each.
    pub fn parse(number: &str) -> Option<Self> {
        let mut parts = number.split('-');
        let prefix = parts.next()?;
        let year = parts.next()?;
        let sequence = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return None;
        }
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if sequence.len() != 4 || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(DocumentNumber {
            prefix: prefix.to_string(),
            year: year.parse().ok()?,
            sequence: sequence.parse().ok()?,
        })
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:04}", self.prefix, self.year, self.sequence)
    }
}

/// Whether a string is a well-formed document number.
pub fn is_valid_format(number: &str) -> bool {
    DocumentNumber::parse(number).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_numbers() {
        let parsed = DocumentNumber::parse("QT-2025-0042").unwrap();
        assert_eq!(parsed.prefix, "QT");
        assert_eq!(parsed.year, 2025);
        assert_eq!(parsed.sequence, 42);
        assert_eq!(parsed.to_string(), "QT-2025-0042");
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(!is_valid_format("QT-2025-1"));
        assert!(!is_valid_format("qt-2025-0001"));
        assert!(!is_valid_format("QT-25-0001"));
        assert!(!is_valid_format("QT-2025-0001-extra"));
        assert!(!is_valid_format("2025-0001"));
    }
}

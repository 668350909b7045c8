//! Parse failures with byte offsets.

use serde::Serialize;
use std::fmt;

/// What went wrong while matching the manifest grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// The text does not start with a property-list dictionary.
    NotAManifest,
    /// A `/* Begin X section */` marker has no matching end marker.
    UnterminatedSection {
        /// The section's `isa` name.
        isa: String,
    },
    /// A `/*` comment is never closed.
    UnterminatedComment,
    /// A quoted string is never closed.
    UnterminatedString,
    /// The section or text ended while a record was still open.
    UnexpectedEnd {
        /// What the grammar required next.
        expected: &'static str,
    },
    /// A byte that cannot continue the current record.
    Unexpected {
        /// What the grammar required.
        expected: &'static str,
        /// The character found instead.
        found: char,
    },
    /// A record lacks a field its kind requires.
    MissingField {
        /// The field name.
        field: &'static str,
    },
    /// A record's `isa` does not match the section it sits in.
    IsaMismatch {
        /// The section's `isa` name.
        section: String,
        /// The record's `isa` value.
        found: String,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::NotAManifest => write!(f, "text is not a property-list manifest"),
            ParseErrorKind::UnterminatedSection { isa } => {
                write!(f, "section `{isa}` has no end marker")
            }
            ParseErrorKind::UnterminatedComment => write!(f, "unterminated comment"),
            ParseErrorKind::UnterminatedString => write!(f, "unterminated quoted string"),
            ParseErrorKind::UnexpectedEnd { expected } => {
                write!(f, "record ends early, expected {expected}")
            }
            ParseErrorKind::Unexpected { expected, found } => {
                write!(f, "expected {expected}, found `{}`", found.escape_debug())
            }
            ParseErrorKind::MissingField { field } => {
                write!(f, "record is missing required field `{field}`")
            }
            ParseErrorKind::IsaMismatch { section, found } => {
                write!(f, "record of type `{found}` inside `{section}` section")
            }
        }
    }
}

/// A manifest that could not be parsed.
///
/// `offset` is the byte where matching failed. When the failure happened
/// inside a record, `record_start` is the byte where that record began, so the
/// whole unmatched record can be pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} at byte {offset}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Byte offset of the failure.
    pub offset: usize,
    /// Start of the record being matched, if any.
    pub record_start: Option<usize>,
}

impl ParseError {
    /// Creates an error not tied to a particular record.
    pub fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            record_start: None,
        }
    }

    pub(crate) fn in_record(mut self, start: usize) -> Self {
        self.record_start.get_or_insert(start);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offset() {
        let err = ParseError::new(
            ParseErrorKind::Unexpected {
                expected: "';'",
                found: '}',
            },
            120,
        );
        assert_eq!(err.to_string(), "expected ';', found `}` at byte 120");
    }

    #[test]
    fn record_start_is_kept_from_innermost() {
        let err = ParseError::new(ParseErrorKind::UnterminatedString, 50)
            .in_record(40)
            .in_record(10);
        assert_eq!(err.record_start, Some(40));
    }

    #[test]
    fn display_missing_field() {
        let err = ParseError::new(ParseErrorKind::MissingField { field: "files" }, 7);
        assert_eq!(
            err.to_string(),
            "record is missing required field `files` at byte 7"
        );
    }
}

//! A byte range tied to a specific loaded manifest.

use crate::file_id::FileId;
use crate::range::TextRange;
use serde::{Deserialize, Serialize};

/// A [`TextRange`] qualified by the manifest it belongs to.
///
/// Diagnostics carry spans so the renderer can look up the right text.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// The manifest this span points into.
    pub file: FileId,
    /// The byte range inside that manifest.
    pub range: TextRange,
}

impl Span {
    /// A span that points nowhere, for diagnostics without a source location.
    pub const DUMMY: Span = Span {
        file: FileId::DUMMY,
        range: TextRange { start: 0, end: 0 },
    };

    /// Creates a span from a file and a byte range.
    pub fn new(file: FileId, range: TextRange) -> Self {
        Self { file, range }
    }

    /// A zero-width span at a single offset, used for parse errors.
    pub fn point(file: FileId, offset: usize) -> Self {
        Self {
            file,
            range: TextRange::empty(offset),
        }
    }

    /// Returns `true` if this is the dummy span.
    pub fn is_dummy(&self) -> bool {
        self.file == FileId::DUMMY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_detection() {
        assert!(Span::DUMMY.is_dummy());
        assert!(!Span::point(FileId::from_raw(0), 0).is_dummy());
    }

    #[test]
    fn serde_roundtrip() {
        let s = Span::new(FileId::from_raw(1), TextRange::new(10, 20));
        let json = serde_json::to_string(&s).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}

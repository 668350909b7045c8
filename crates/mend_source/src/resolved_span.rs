//! Human-readable source locations.

use std::fmt;
use std::path::PathBuf;

/// A span resolved to 1-indexed line/column coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpan {
    /// Path of the manifest.
    pub file_path: PathBuf,
    /// Byte offset of the span start, reported alongside the line/column.
    pub offset: usize,
    /// Starting line (1-indexed).
    pub line: u32,
    /// Starting column in bytes (1-indexed).
    pub col: u32,
}

impl fmt::Display for ResolvedSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} (byte {})",
            self.file_path.display(),
            self.line,
            self.col,
            self.offset
        )
    }
}

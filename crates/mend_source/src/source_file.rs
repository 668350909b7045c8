//! A loaded manifest text with a line-start index.

use crate::file_id::FileId;
use mend_common::ContentHash;
use std::path::PathBuf;

/// One manifest loaded into the [`SourceDb`](crate::SourceDb).
pub struct SourceFile {
    /// Identifier inside the owning database.
    pub id: FileId,
    /// Filesystem path (or a synthetic name for in-memory text).
    pub path: PathBuf,
    /// The full text.
    pub content: String,
    /// Byte offsets where each line begins; the first entry is always 0.
    line_starts: Vec<usize>,
    /// Hash of `content`.
    pub content_hash: ContentHash,
}

impl SourceFile {
    /// Creates a source file, indexing line starts and hashing the content.
    pub fn new(id: FileId, path: PathBuf, content: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                content
                    .bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        let content_hash = ContentHash::from_bytes(content.as_bytes());
        Self {
            id,
            path,
            content,
            line_starts,
            content_hash,
        }
    }

    /// Converts a byte offset into 1-indexed (line, column).
    ///
    /// Offsets past the end are clamped to the end of the text.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.content.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let col = offset - self.line_starts[line_idx] + 1;
        ((line_idx + 1) as u32, col as u32)
    }

    /// Returns the full line containing `offset`, without its newline.
    pub fn line_text(&self, offset: usize) -> &str {
        let offset = offset.min(self.content.len());
        let start = self.content[..offset].rfind('\n').map_or(0, |p| p + 1);
        let end = self.content[offset..]
            .find('\n')
            .map_or(self.content.len(), |p| offset + p);
        &self.content[start..end]
    }
}

//! The before/after report of a run.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Counts and outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// The manifest.
    pub manifest: PathBuf,
    /// Duplicate groups resolved.
    pub duplicate_groups: usize,
    /// Build file records removed.
    pub entries_removed: usize,
    /// Compile-list items removed.
    pub phase_entries_removed: usize,
    /// File reference and phase records removed as repeats.
    pub other_records_removed: usize,
    /// Files newly compiled.
    pub entries_inserted: usize,
    /// Manifest size before.
    pub bytes_before: usize,
    /// Manifest size after, or what it would be for a dry run.
    pub bytes_after: usize,
    /// Where the original was saved, if it was.
    pub backup_path: Option<PathBuf>,
    /// `true` if the working file was rewritten.
    pub committed: bool,
    /// `true` if the run computed any edit.
    pub changed: bool,
    /// `true` if nothing was written by request.
    pub dry_run: bool,
}

impl Summary {
    /// Signed size change in bytes.
    pub fn byte_delta(&self) -> i64 {
        self.bytes_after as i64 - self.bytes_before as i64
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.changed {
            return write!(
                f,
                "{}: consistent, nothing to do ({} bytes)",
                self.manifest.display(),
                self.bytes_before
            );
        }
        write!(
            f,
            "{}: {} duplicate group(s), {} entr{} removed, {} phase item(s) removed, {} inserted; {} -> {} bytes ({:+})",
            self.manifest.display(),
            self.duplicate_groups,
            self.entries_removed,
            if self.entries_removed == 1 { "y" } else { "ies" },
            self.phase_entries_removed,
            self.entries_inserted,
            self.bytes_before,
            self.bytes_after,
            self.byte_delta(),
        )?;
        if let Some(backup) = &self.backup_path {
            write!(f, "; backup at {}", backup.display())?;
        }
        if self.dry_run {
            write!(f, " (dry run, nothing written)")?;
        }
        Ok(())
    }
}

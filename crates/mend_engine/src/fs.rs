//! Whole-file access used by the driver.

use std::io::{self, Write};
use std::path::Path;
use tracing::debug;

/// Read and write capability over whole files.
///
/// Writes must be all-or-nothing: after `write_atomic` returns, the target
/// holds either the old or the new contents, never a mix.
pub trait FileSystem {
    /// Reads a whole UTF-8 file.
    fn read(&self, path: &Path) -> io::Result<String>;

    /// Replaces `path` with `contents` atomically.
    fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// The real file system.
///
/// Writes go to a temporary file in the target's directory, which is synced
/// and renamed over the target; the directory is synced afterwards so the
/// rename itself is durable. An existing target's permissions are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl FileSystem for StdFs {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        if let Ok(metadata) = std::fs::metadata(path) {
            tmp.as_file().set_permissions(metadata.permissions())?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        sync_dir(dir);
        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(err) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), %err, "directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

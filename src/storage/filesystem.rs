//! File system operations
//!
//! Low-level helpers shared by the template service and the backup store:
//! exclusive-lock writes, protected directory creation and metadata access.

use fs4::FileExt;
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::{Result, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Marker dropped in directories that must never be served over the web
pub const DENY_MARKER_FILE: &str = ".htaccess";
const DENY_MARKER_CONTENT: &str = "Deny from all";

/// Writes replacement content onto an existing file.
///
/// The template service is the only caller; tests swap in failing writers
/// to exercise the restore path.
pub trait ContentWriter: Send + Sync {
    /// Replaces the whole file content and returns the number of bytes written
    fn write_replace(&self, path: &Path, content: &[u8]) -> Result<usize>;
}

/// Truncate-and-replace writer holding an exclusive lock for the duration
/// of the write.
#[derive(Debug, Default, Clone, Copy)]
pub struct LockedFileWriter;

impl ContentWriter for LockedFileWriter {
    fn write_replace(&self, path: &Path, content: &[u8]) -> Result<usize> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        file.lock_exclusive()?;

        // Truncate only once the lock is held so readers never see a half-empty file
        file.set_len(0)?;
        file.write_all(content)?;
        file.flush()?;
        file.sync_all()?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        // Lock is released when `file` is dropped
        Ok(content.len())
    }
}

/// Create a directory
pub fn create_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
}

/// Creates `path` if needed and drops a deny-all marker into it
pub fn ensure_protected_directory(path: &Path) -> Result<()> {
    create_directory(path)?;
    let marker = path.join(DENY_MARKER_FILE);
    if !marker.exists() {
        fs::write(&marker, DENY_MARKER_CONTENT)?;
    }
    Ok(())
}

/// Check if file exists
pub fn file_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// Size in bytes, 0 when the file is gone
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Modification time in seconds since the epoch, 0 when unavailable
pub fn modified_secs(path: &Path) -> u64 {
    fs::metadata(path)
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|dur| dur.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn locked_writer_replaces_longer_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("header.php");
        fs::write(&path, "a much longer original body").unwrap();

        let written = LockedFileWriter.write_replace(&path, b"short").unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn locked_writer_does_not_create_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.php");
        assert!(LockedFileWriter.write_replace(&path, b"x").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn protected_directory_gets_marker_once() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");

        ensure_protected_directory(&backups).unwrap();
        ensure_protected_directory(&backups).unwrap();

        let marker = fs::read_to_string(backups.join(DENY_MARKER_FILE)).unwrap();
        assert_eq!(marker, "Deny from all");
    }

    #[test]
    fn missing_file_has_zero_size() {
        let dir = TempDir::new().unwrap();
        assert_eq!(file_size(&dir.path().join("gone.backup")), 0);
    }
}

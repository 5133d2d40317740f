//! File permissions
//!
//! Probes whether the server process can read or write a file right now.
//! Results are never cached; permissions may change between requests.

use std::fs::{File, OpenOptions};
use std::path::Path;

/// Check if file is readable
pub fn is_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

/// Check if file is writable.
///
/// Opens without truncation, so the probe leaves the content untouched.
pub fn is_writable(path: &Path) -> bool {
    match path.metadata() {
        Ok(metadata) if metadata.is_file() && !metadata.permissions().readonly() => {
            OpenOptions::new().write(true).open(path).is_ok()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_neither_readable_nor_writable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.php");
        assert!(!is_readable(&path));
        assert!(!is_writable(&path));
    }

    #[test]
    fn readonly_file_is_not_writable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.php");
        fs::write(&path, "<?php").unwrap();

        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        assert!(is_readable(&path));
        assert!(!is_writable(&path));
    }

    #[test]
    fn directory_is_not_a_readable_file() {
        let dir = TempDir::new().unwrap();
        assert!(!is_readable(dir.path()));
        assert!(!is_writable(dir.path()));
    }
}

//! Atomic file replacement.
//!
//! 1. Render the full new content in memory (done by the caller).
//! 2. Ensure the parent directory exists.
//! 3. Write to `<path>.postbook.tmp`.
//! 4. Rename over the final path (atomic on POSIX).
//!
//! A failed rename removes the temp file and leaves the previous file intact.

use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};

/// Temp path used while replacing `path`.
pub fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.postbook.tmp", path.display()))
}

/// Atomically replace `path` with `content`.
pub fn replace_file(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    replace_file_with_tmp(path, content, &tmp_path(path))
}

fn replace_file_with_tmp(path: &Path, content: &[u8], tmp: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }

    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!(path = %path.display(), bytes = content.len(), "replaced file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn first_write_creates_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.xlsx");
        replace_file(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn second_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.xlsx");
        replace_file(&path, b"v1").unwrap();
        replace_file(&path, b"v2").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"v2");
    }

    #[test]
    fn tmp_file_removed_after_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clean.xlsx");
        replace_file(&path, b"data").unwrap();
        assert!(!tmp_path(&path).exists(), ".postbook.tmp must be cleaned up");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("nested").join("rust.xlsx");
        replace_file(&path, b"content").unwrap();
        assert!(path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_tmp() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let readonly_dir = root.path().join("readonly");
        fs::create_dir_all(&readonly_dir).unwrap();

        let path = readonly_dir.join("rust.xlsx");
        fs::write(&path, "original").unwrap();

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o555);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        let tmp_dir = TempDir::new().unwrap();
        let tmp = tmp_dir.path().join("rust.xlsx.postbook.tmp");

        let result = replace_file_with_tmp(&path, b"new content", &tmp);

        let mut perms = fs::metadata(&readonly_dir).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&readonly_dir, perms).unwrap();

        // Running as root bypasses directory permissions; only check the
        // failure path when the rename was actually refused.
        if result.is_err() {
            assert_eq!(fs::read_to_string(&path).unwrap(), "original");
            assert!(!tmp.exists(), ".postbook.tmp should be cleaned up");
        }
    }
}

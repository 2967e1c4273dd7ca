//! Local filesystem access
//!
//! On desktop platforms there is no sandbox bracket to open, so access is
//! granted whenever the path names a readable regular file.

use std::fs::File;
use std::path::Path;

use crate::ports::FileAccess;

/// File access for files on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileAccess;

impl LocalFileAccess {
    pub fn new() -> Self {
        Self
    }
}

impl FileAccess for LocalFileAccess {
    fn start_accessing(&self, path: &Path) -> bool {
        let is_file = std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
        is_file && File::open(path).is_ok()
    }

    fn stop_accessing(&self, _path: &Path) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_grants_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("statement.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let access = LocalFileAccess::new();
        assert!(access.start_accessing(&path));
        assert_eq!(access.read(&path).unwrap(), b"%PDF");
    }

    #[test]
    fn test_refuses_missing_file_and_directories() {
        let dir = tempdir().unwrap();
        let access = LocalFileAccess::new();
        assert!(!access.start_accessing(&dir.path().join("missing.pdf")));
        assert!(!access.start_accessing(dir.path()));
    }
}

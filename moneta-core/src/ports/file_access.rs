//! Scoped file access port
//!
//! User-selected files may live outside the application's own storage.
//! Reading them is bracketed by a start/stop pair; `ScopedAccess` holds the
//! bracket open for its lifetime and closes it on drop, so every exit path
//! (including errors) releases the access.

use std::path::Path;

use crate::domain::result::ImportError;

/// Platform mechanism for reading user-selected files
pub trait FileAccess: Send + Sync {
    /// Begin access to `path`; returns false when access is refused
    fn start_accessing(&self, path: &Path) -> bool;

    /// End access previously granted by `start_accessing`
    fn stop_accessing(&self, path: &Path);

    /// Read the whole file while access is held
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Open access bracket around one file
pub struct ScopedAccess<'a> {
    access: &'a dyn FileAccess,
    path: &'a Path,
}

impl<'a> ScopedAccess<'a> {
    /// Start accessing `path`, failing with `AccessDenied` when refused
    pub fn acquire(access: &'a dyn FileAccess, path: &'a Path) -> Result<Self, ImportError> {
        if !access.start_accessing(path) {
            return Err(ImportError::AccessDenied);
        }
        Ok(Self { access, path })
    }

    /// Read the full contents; no size cap is applied here
    pub fn read_all(&self) -> Result<Vec<u8>, ImportError> {
        self.access
            .read(self.path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => ImportError::AccessDenied,
                _ => ImportError::ReadError(e.to_string()),
            })
    }
}

impl Drop for ScopedAccess<'_> {
    fn drop(&mut self) {
        self.access.stop_accessing(self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        granted: bool,
        started: AtomicUsize,
        stopped: AtomicUsize,
    }

    impl FileAccess for Counting {
        fn start_accessing(&self, _path: &Path) -> bool {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.granted
        }

        fn stop_accessing(&self, _path: &Path) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }

        fn read(&self, _path: &Path) -> std::io::Result<Vec<u8>> {
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated"))
        }
    }

    #[test]
    fn test_refused_access_is_access_denied() {
        let access = Counting::default();
        let result = ScopedAccess::acquire(&access, Path::new("/tmp/statement.pdf"));
        assert!(matches!(result, Err(ImportError::AccessDenied)));
        // Nothing was granted, so nothing is released
        assert_eq!(access.stopped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_access_released_after_read_error() {
        let access = Counting { granted: true, ..Default::default() };
        {
            let scoped = ScopedAccess::acquire(&access, Path::new("/tmp/statement.pdf")).unwrap();
            let err = scoped.read_all().unwrap_err();
            assert!(matches!(err, ImportError::ReadError(_)));
        }
        assert_eq!(access.started.load(Ordering::SeqCst), 1);
        assert_eq!(access.stopped.load(Ordering::SeqCst), 1);
    }
}

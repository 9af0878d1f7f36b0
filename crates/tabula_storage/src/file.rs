//! Plain file manager for persistent storage.

use crate::error::StorageResult;
use crate::manager::FileManager;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A file manager backed by a single plain file.
///
/// # Atomicity
///
/// `write()` writes a sibling temporary file and renames it over the
/// target, so a reader never observes a half-written table. Together with
/// the internal lock this gives whole-file replacement from the point of
/// view of every thread in the process. There is no cross-process
/// coordination.
///
/// # Thread Safety
///
/// All operations take the manager's lock, so overlapping calls from
/// several threads are serialized.
///
/// # Example
///
/// ```no_run
/// use tabula_storage::{DefaultFileManager, FileManager};
///
/// let manager = DefaultFileManager::new("appdata/shop/Orders.json");
/// assert!(manager.read().unwrap().is_empty());
/// manager.write(b"[]").unwrap();
/// assert!(manager.exists().unwrap());
/// ```
#[derive(Debug)]
pub struct DefaultFileManager {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DefaultFileManager {
    /// Creates a manager for the file at `path`.
    ///
    /// Nothing is touched on disk until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("table"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl FileManager for DefaultFileManager {
    fn read(&self) -> StorageResult<Vec<u8>> {
        let _guard = self.lock.lock();

        match fs::read(&self.path) {
            Ok(data) => {
                tracing::trace!(path = %self.path.display(), bytes = data.len(), "read table file");
                Ok(data)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, data: &[u8]) -> StorageResult<()> {
        let _guard = self.lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, data)?;
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        tracing::trace!(path = %self.path.display(), bytes = data.len(), "wrote table file");
        Ok(())
    }

    fn exists(&self) -> StorageResult<bool> {
        let _guard = self.lock.lock();
        Ok(self.path.try_exists()?)
    }

    fn clear(&self) -> StorageResult<bool> {
        let _guard = self.lock.lock();

        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::trace!(path = %self.path.display(), "deleted table file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn read_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let manager = DefaultFileManager::new(dir.path().join("missing.json"));

        assert!(manager.read().unwrap().is_empty());
        assert!(!manager.exists().unwrap());
    }

    #[test]
    fn write_and_read() {
        let dir = tempdir().unwrap();
        let manager = DefaultFileManager::new(dir.path().join("t.json"));

        manager.write(b"hello world").unwrap();
        assert_eq!(manager.read().unwrap(), b"hello world");
        assert!(manager.exists().unwrap());
    }

    #[test]
    fn write_replaces_content() {
        let dir = tempdir().unwrap();
        let manager = DefaultFileManager::new(dir.path().join("t.json"));

        manager.write(b"a much longer first version").unwrap();
        manager.write(b"short").unwrap();
        assert_eq!(manager.read().unwrap(), b"short");
        assert!(!dir.path().join("t.json.tmp").exists());
    }

    #[test]
    fn write_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ns").join("t.csv");
        let manager = DefaultFileManager::new(&path);

        manager.write(b"x").unwrap();
        assert!(path.exists());

        // idempotent
        manager.write(b"y").unwrap();
        assert_eq!(manager.read().unwrap(), b"y");
    }

    #[test]
    fn clear_reports_deletion() {
        let dir = tempdir().unwrap();
        let manager = DefaultFileManager::new(dir.path().join("t.json"));

        assert!(!manager.clear().unwrap());
        manager.write(b"data").unwrap();
        assert!(manager.clear().unwrap());
        assert!(!manager.exists().unwrap());
        assert!(!manager.clear().unwrap());
    }

    #[test]
    fn path_accessor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.json");
        let manager = DefaultFileManager::new(&path);
        assert_eq!(manager.path(), path);
    }

    #[test]
    fn concurrent_writers_never_tear() {
        let dir = tempdir().unwrap();
        let manager = Arc::new(DefaultFileManager::new(dir.path().join("t.bin")));

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let manager = Arc::clone(&manager);
                thread::spawn(move || {
                    let payload = vec![i; 4096];
                    for _ in 0..20 {
                        manager.write(&payload).unwrap();
                        let read = manager.read().unwrap();
                        assert_eq!(read.len(), 4096);
                        assert!(read.iter().all(|b| *b == read[0]));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}

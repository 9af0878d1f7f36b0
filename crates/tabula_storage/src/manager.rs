//! File manager trait definition.

use crate::error::StorageResult;
use std::path::Path;

/// Owns the on-disk content of one table.
///
/// File managers are **opaque blob stores**. The serialized table is read and
/// replaced as a whole; interpreting it is the job of the serialization
/// format that produced it.
///
/// # Invariants
///
/// - `read` of a missing file returns an empty blob, never an error
/// - after `write(data)` returns, `read` returns exactly `data`
/// - `clear` returns `true` only if something was actually deleted
/// - overlapping calls on one manager never interleave physical I/O
///
/// # Implementors
///
/// - [`super::DefaultFileManager`] - Plain files
/// - [`super::EncryptedFileManager`] - AES-256-GCM wrapper over another manager
pub trait FileManager: Send + Sync + std::fmt::Debug {
    /// Reads the whole content of the table file.
    ///
    /// Returns an empty blob when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    fn read(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the whole content of the table file.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file
    /// cannot be written.
    fn write(&self, data: &[u8]) -> StorageResult<()>;

    /// Returns whether the table file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self) -> StorageResult<bool>;

    /// Deletes the table file.
    ///
    /// Returns `true` if a file was deleted, `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    fn clear(&self) -> StorageResult<bool>;

    /// Returns the resolved location of the table file.
    fn path(&self) -> &Path;
}

//! # Tabula Storage
//!
//! File managers for Tabula tables.
//!
//! Every table is persisted as one file holding the table's full serialized
//! content. File managers treat that content as an **opaque blob** - they do
//! not know which serialization format produced it.
//!
//! ## Design Principles
//!
//! - One manager owns exactly one table file
//! - Whole-file read and replace, no appends or journaling
//! - Every physical operation runs under the manager's own lock
//! - Managers must be `Send + Sync`
//!
//! ## Available Managers
//!
//! - [`DefaultFileManager`] - Plain files on the local file system
//! - [`EncryptedFileManager`] - Wrapper that adds AES-256-GCM encryption
//!
//! ## Example
//!
//! ```no_run
//! use tabula_storage::{table_file_path, DefaultFileManager, FileManager};
//! use std::path::Path;
//!
//! let path = table_file_path(Path::new("appdata"), "shop", "Orders", "json");
//! let manager = DefaultFileManager::new(path);
//! manager.write(b"[]").unwrap();
//! assert_eq!(manager.read().unwrap(), b"[]");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod encrypted;
mod error;
mod file;
mod manager;
mod path;

pub use encrypted::{EncryptedFileManager, EncryptionKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{StorageError, StorageResult};
pub use file::DefaultFileManager;
pub use manager::FileManager;
pub use path::{sanitize_file_name, table_file_path};

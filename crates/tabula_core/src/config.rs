//! Store configuration.

use std::path::{Path, PathBuf};
use tabula_codec::FormatKind;
use tabula_storage::EncryptionKey;

/// Default directory that holds table files when no location is given.
pub const DEFAULT_BASE_DIR: &str = "appdata";

/// How entity kinds are mapped onto tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableMatching {
    /// Every entity kind has its own table, even if two kinds share a name.
    #[default]
    ByKind,
    /// Entity kinds with the same table name share one table.
    ByName,
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Sub-directory of the root that holds this store's files. Empty
    /// means the root itself.
    pub namespace: String,

    /// Explicit root directory. Overrides `base_dir` when set.
    pub location: Option<PathBuf>,

    /// Root directory used when no `location` is set.
    pub base_dir: PathBuf,

    /// Serialization format of the table files.
    pub format: FormatKind,

    /// How entity kinds are mapped onto tables.
    pub table_matching: TableMatching,

    /// Whether keys and values may appear in errors and logs.
    pub sensitive_logging: bool,

    /// Encrypt table files with this key.
    pub encryption_key: Option<EncryptionKey>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            location: None,
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            format: FormatKind::Json,
            table_matching: TableMatching::ByKind,
            sensitive_logging: false,
            encryption_key: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the namespace sub-directory.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets an explicit root directory.
    #[must_use]
    pub fn location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the fallback root directory.
    #[must_use]
    pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Sets the serialization format.
    #[must_use]
    pub const fn format(mut self, format: FormatKind) -> Self {
        self.format = format;
        self
    }

    /// Sets how entity kinds are mapped onto tables.
    #[must_use]
    pub const fn table_matching(mut self, matching: TableMatching) -> Self {
        self.table_matching = matching;
        self
    }

    /// Sets whether keys and values may appear in errors and logs.
    #[must_use]
    pub const fn sensitive_logging(mut self, value: bool) -> Self {
        self.sensitive_logging = value;
        self
    }

    /// Encrypts table files with `key`.
    #[must_use]
    pub fn encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    /// Returns the root directory: the explicit location if set, the base
    /// directory otherwise.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        self.location.as_deref().unwrap_or(&self.base_dir)
    }

    /// Returns the directory holding the table files.
    #[must_use]
    pub fn table_dir(&self) -> PathBuf {
        if self.namespace.is_empty() {
            self.root_dir().to_path_buf()
        } else {
            self.root_dir()
                .join(tabula_storage::sanitize_file_name(&self.namespace))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "");
        assert_eq!(config.root_dir(), Path::new("appdata"));
        assert_eq!(config.format, FormatKind::Json);
        assert_eq!(config.table_matching, TableMatching::ByKind);
        assert!(!config.sensitive_logging);
        assert!(config.encryption_key.is_none());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .namespace("shop")
            .format(FormatKind::Csv)
            .table_matching(TableMatching::ByName)
            .sensitive_logging(true);

        assert_eq!(config.namespace, "shop");
        assert_eq!(config.format, FormatKind::Csv);
        assert_eq!(config.table_matching, TableMatching::ByName);
        assert!(config.sensitive_logging);
        assert_eq!(config.table_dir(), Path::new("appdata").join("shop"));
    }

    #[test]
    fn location_overrides_base_dir() {
        let config = Config::new().base_dir("base").location("/data/tables").namespace("ns");
        assert_eq!(config.root_dir(), Path::new("/data/tables"));
        assert_eq!(config.table_dir(), Path::new("/data/tables").join("ns"));
    }

    #[test]
    fn encryption_key_is_redacted_in_debug() {
        let config = Config::new().encryption_key(EncryptionKey::generate());
        assert!(format!("{config:?}").contains("REDACTED"));
    }
}

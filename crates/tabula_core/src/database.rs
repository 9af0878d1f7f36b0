//! Database facade.

use crate::cache::StoreCache;
use crate::config::Config;
use crate::error::CoreResult;
use crate::intent::RowIntent;
use crate::model::{EntityKind, Model};
use crate::store::{Store, TableSnapshot};
use std::sync::Arc;
use tracing::info;

/// The main database handle.
///
/// `Database` is the entry point the object mapping layer talks to. It
/// owns a [`Store`], either private or shared through a [`StoreCache`],
/// and forwards batches of [`RowIntent`]s to it.
///
/// # Opening a Database
///
/// ```
/// use std::sync::Arc;
/// use tabula_codec::{FormatKind, Value, ValueType};
/// use tabula_core::{Config, Database, EntityKind, Model, Property, RowIntent};
///
/// let dir = tempfile::tempdir().unwrap();
/// let model = Arc::new(
///     Model::builder()
///         .entity(
///             EntityKind::builder("User")
///                 .property(Property::new("Id", ValueType::Int64).generated_on_add())
///                 .property(Property::new("Email", ValueType::Text))
///                 .key(["Id"]),
///         )
///         .build()
///         .unwrap(),
/// );
/// let config = Config::new().location(dir.path()).format(FormatKind::Csv);
/// let db = Database::open(Arc::clone(&model), config);
/// db.ensure_created().unwrap();
///
/// let user = model.kind("User").unwrap();
/// db.save_changes(&[RowIntent::added(&user, vec![Value::Null, Value::from("a@example.com")])])
///     .unwrap();
/// assert!(dir.path().join("User.csv").exists());
/// ```
///
/// # Shared stores
///
/// Handles opened with [`Database::open_cached`] over the same location,
/// namespace and format share one store.
#[derive(Debug, Clone)]
pub struct Database {
    store: Arc<Store>,
}

impl Database {
    /// Opens a database with a store of its own.
    #[must_use]
    pub fn open(model: Arc<Model>, config: Config) -> Self {
        Self {
            store: Arc::new(Store::new(model, config)),
        }
    }

    /// Opens a database over the store `cache` holds for `config`.
    #[must_use]
    pub fn open_cached(cache: &StoreCache, model: &Arc<Model>, config: &Config) -> Self {
        Self {
            store: cache.get_store(model, config),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Returns the model.
    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        self.store.model()
    }

    /// Creates the tables and applies seed rows. See [`Store::ensure_created`].
    ///
    /// # Errors
    ///
    /// Returns an error if the seed batch fails.
    pub fn ensure_created(&self) -> CoreResult<bool> {
        self.store.ensure_created()
    }

    /// Deletes every table file. See [`Store::ensure_deleted`].
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be removed.
    pub fn ensure_deleted(&self) -> CoreResult<bool> {
        self.store.ensure_deleted()
    }

    /// Returns whether any table file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    pub fn exists(&self) -> CoreResult<bool> {
        self.store.exists()
    }

    /// Returns snapshots of `kind` and its concrete derived kinds.
    #[must_use]
    pub fn tables(&self, kind: &EntityKind) -> Vec<TableSnapshot> {
        self.store.tables(kind)
    }

    /// Applies a batch of intents and saves. See [`Store::execute_transaction`].
    ///
    /// # Errors
    ///
    /// Returns the first failure of the batch, wrapped with the number of
    /// intents applied before it.
    pub fn save_changes(&self, intents: &[RowIntent]) -> CoreResult<usize> {
        let count = self.store.execute_transaction(intents)?;
        info!(count, "changes saved");
        Ok(count)
    }

    /// Applies a batch on tokio's blocking pool.
    ///
    /// Dropping the future does not cancel a batch that has started.
    ///
    /// # Errors
    ///
    /// Same as [`Database::save_changes`], or
    /// [`CoreError::InvalidOperation`](crate::CoreError::InvalidOperation) if
    /// the blocking task panicked.
    #[cfg(feature = "async")]
    pub async fn save_changes_async(&self, intents: Vec<RowIntent>) -> CoreResult<usize> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.save_changes(&intents))
            .await
            .map_err(|e| crate::CoreError::invalid_operation(format!("save task failed: {e}")))?
    }
}

//! The store: the set of tables of one model and the lock around them.

use crate::config::{Config, TableMatching};
use crate::error::{CoreError, CoreResult};
use crate::generator::IntegerValueGenerator;
use crate::intent::{IntentState, RowIntent};
use crate::model::{EntityKind, EntityKindId, Model};
use crate::table::{file_manager_for, Table};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tabula_codec::Row;
use tracing::{debug, info, warn};

/// How a table is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TableKey {
    Kind(EntityKindId),
    Name(String),
}

type Tables = HashMap<TableKey, Table>;

/// The rows of one concrete entity kind at one point in time.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    /// The entity kind.
    pub kind: Arc<EntityKind>,
    /// Copies of the rows, in key order.
    pub rows: Vec<Row>,
}

/// Owns the tables of a model.
///
/// Tables are opened lazily, the first time an operation touches their
/// kind. A single mutex serializes table resolution, batches, snapshots,
/// seeding and clearing. The table set starts out absent; this is how
/// [`Store::ensure_created`] tells a fresh store from one already in use.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tabula_codec::{Value, ValueType};
/// use tabula_core::{Config, EntityKind, Model, Property, RowIntent, Store};
///
/// let dir = tempfile::tempdir().unwrap();
/// let model = Arc::new(
///     Model::builder()
///         .entity(
///             EntityKind::builder("Note")
///                 .property(Property::new("Id", ValueType::Int32))
///                 .property(Property::new("Text", ValueType::Text))
///                 .key(["Id"]),
///         )
///         .build()
///         .unwrap(),
/// );
/// let store = Store::new(Arc::clone(&model), Config::new().location(dir.path()));
///
/// let note = model.kind("Note").unwrap();
/// let applied = store
///     .execute_transaction(&[RowIntent::added(&note, vec![Value::Int32(1), Value::from("hi")])])
///     .unwrap();
/// assert_eq!(applied, 1);
/// assert_eq!(store.tables(&note)[0].rows.len(), 1);
/// ```
#[derive(Debug)]
pub struct Store {
    model: Arc<Model>,
    config: Config,
    tables: Mutex<Option<Tables>>,
}

impl Store {
    /// Creates a store over `model`. No file is touched until first use.
    #[must_use]
    pub fn new(model: Arc<Model>, config: Config) -> Self {
        Self {
            model,
            config,
            tables: Mutex::new(None),
        }
    }

    /// Returns the model.
    #[must_use]
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Materializes the table set and applies every kind's seed rows.
    ///
    /// Returns `true` on the call that created the table set and `false`
    /// on every later call, or once any other operation has touched the
    /// store. Seed rows whose key is already stored are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed batch fails.
    pub fn ensure_created(&self) -> CoreResult<bool> {
        let mut guard = self.tables.lock();
        if guard.is_some() {
            return Ok(false);
        }
        let tables = guard.insert(Tables::new());

        let mut seed = Vec::new();
        for kind in self.model.concrete_kinds() {
            let table = self.resolve(tables, kind);
            for row in kind.seed_rows() {
                if !table.contains(&kind.key_of(row)?) {
                    seed.push(RowIntent::added(kind, row.clone()));
                }
            }
        }

        let seeded = self.execute_locked(tables, &seed)?;
        info!(
            root = %self.config.table_dir().display(),
            seeded,
            "store created"
        );
        Ok(true)
    }

    /// Discards the table set. The next operation re-reads every file.
    ///
    /// Returns `false` if there was nothing to discard.
    pub fn clear(&self) -> bool {
        self.tables.lock().take().is_some()
    }

    /// Returns snapshots of `kind`'s table and the tables of every
    /// concrete kind deriving from it.
    #[must_use]
    pub fn tables(&self, kind: &EntityKind) -> Vec<TableSnapshot> {
        let mut guard = self.tables.lock();
        let tables = guard.get_or_insert_with(Tables::new);
        self.model
            .derived_inclusive(kind)
            .into_iter()
            .filter(|k| !k.is_abstract())
            .map(|k| {
                let rows = self.resolve(tables, &k).snapshot_rows();
                TableSnapshot { kind: k, rows }
            })
            .collect()
    }

    /// Applies a batch of intents and saves every table.
    ///
    /// Intents are applied in order. The first failure stops the batch;
    /// intents applied before it are not rolled back and are saved.
    ///
    /// Returns the number of intents that took effect. The deleted side of
    /// a shared identity pair is skipped and not counted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BatchAborted`] wrapping the first failure, or
    /// the save error if only saving failed.
    pub fn execute_transaction(&self, intents: &[RowIntent]) -> CoreResult<usize> {
        let mut guard = self.tables.lock();
        let tables = guard.get_or_insert_with(Tables::new);
        self.execute_locked(tables, intents)
    }

    /// Returns the value generator of `kind`'s integer property `property`.
    ///
    /// # Errors
    ///
    /// Returns an error if the property does not exist or is not an
    /// integer property.
    pub fn integer_value_generator(
        &self,
        kind: &Arc<EntityKind>,
        property: &str,
    ) -> CoreResult<Arc<IntegerValueGenerator>> {
        let mut guard = self.tables.lock();
        let tables = guard.get_or_insert_with(Tables::new);
        let table = self.resolve(tables, kind);
        let column = table.kind().require_position(property)?;
        table.integer_value_generator(column)
    }

    /// Deletes every table file of the model and discards the table set.
    ///
    /// Returns `true` if any file was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be removed.
    pub fn ensure_deleted(&self) -> CoreResult<bool> {
        let mut guard = self.tables.lock();
        *guard = None;

        let mut seen = HashSet::new();
        let mut deleted = false;
        for kind in self.model.concrete_kinds() {
            let file = file_manager_for(kind, &self.config);
            if seen.insert(file.path().to_path_buf()) {
                deleted |= file.clear()?;
            }
        }
        info!(root = %self.config.table_dir().display(), deleted, "store deleted");
        Ok(deleted)
    }

    /// Returns whether any table file of the model exists.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    pub fn exists(&self) -> CoreResult<bool> {
        for kind in self.model.concrete_kinds() {
            if file_manager_for(kind, &self.config).exists()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn table_key(&self, kind: &EntityKind) -> TableKey {
        match self.config.table_matching {
            TableMatching::ByKind => TableKey::Kind(kind.id()),
            TableMatching::ByName => TableKey::Name(kind.table_name().to_string()),
        }
    }

    fn resolve<'t>(&self, tables: &'t mut Tables, kind: &Arc<EntityKind>) -> &'t mut Table {
        tables
            .entry(self.table_key(kind))
            .or_insert_with(|| Table::open(Arc::clone(kind), &self.config))
    }

    fn execute_locked(&self, tables: &mut Tables, intents: &[RowIntent]) -> CoreResult<usize> {
        let mut applied = 0;
        let mut failure = None;
        for intent in intents {
            match self.apply(tables, intent) {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        // saved even after a failure, so the files match memory
        let saved = tables.values().try_for_each(Table::save);
        match (failure, saved) {
            (Some(e), Err(save_error)) => {
                warn!(error = %save_error, "saving after a failed batch also failed");
                Err(CoreError::batch_aborted(applied, e))
            }
            (Some(e), Ok(())) => Err(CoreError::batch_aborted(applied, e)),
            (None, Err(e)) => Err(e),
            (None, Ok(())) => {
                debug!(applied, tables = tables.len(), "batch applied");
                Ok(applied)
            }
        }
    }

    fn apply(&self, tables: &mut Tables, intent: &RowIntent) -> CoreResult<bool> {
        if intent.kind.is_abstract() {
            return Err(CoreError::invalid_operation(format!(
                "{} is abstract and has no table",
                intent.kind.name()
            )));
        }
        if intent.shared_identity && intent.state == IntentState::Deleted {
            return Ok(false);
        }

        let table = self.resolve(tables, &intent.kind);
        if intent.shared_identity {
            table.delete(intent)?;
        }
        match intent.state {
            IntentState::Added => table.create(intent)?,
            IntentState::Modified => table.update(intent)?,
            IntentState::Deleted => table.delete(intent)?,
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Property;
    use tabula_codec::{Value, ValueType};
    use tempfile::TempDir;

    fn model() -> Arc<Model> {
        Arc::new(
            Model::builder()
                .entity(
                    EntityKind::builder("Item")
                        .property(Property::new("Id", ValueType::Int32).generated_on_add())
                        .property(Property::new("Name", ValueType::Text))
                        .key(["Id"])
                        .seed(vec![Value::Int32(1), Value::from("seeded")]),
                )
                .build()
                .unwrap(),
        )
    }

    fn store(dir: &TempDir) -> Store {
        Store::new(model(), Config::new().location(dir.path()))
    }

    fn item(id: i32, name: &str) -> Row {
        vec![Value::Int32(id), Value::from(name)]
    }

    #[test]
    fn ensure_created_seeds_once() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let kind = store.model().kind("Item").unwrap();

        assert!(store.ensure_created().unwrap());
        assert!(!store.ensure_created().unwrap());
        assert_eq!(store.tables(&kind)[0].rows, vec![item(1, "seeded")]);
        assert!(dir.path().join("Item.json").exists());
    }

    #[test]
    fn reopened_store_skips_stored_seed_rows() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).ensure_created().unwrap());

        let store = store(&dir);
        assert!(store.ensure_created().unwrap());
        let kind = store.model().kind("Item").unwrap();
        assert_eq!(store.tables(&kind)[0].rows.len(), 1);
    }

    #[test]
    fn clear_reports_whether_tables_existed() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(!store.clear());
        store.ensure_created().unwrap();
        assert!(store.clear());
        assert!(store.ensure_created().unwrap());
    }

    #[test]
    fn shared_identity_replaces_the_row() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_created().unwrap();
        let kind = store.model().kind("Item").unwrap();

        let applied = store
            .execute_transaction(&[
                RowIntent::deleted(&kind, item(1, "seeded")).shared_identity(),
                RowIntent::added(&kind, item(1, "replaced")).shared_identity(),
            ])
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(store.tables(&kind)[0].rows, vec![item(1, "replaced")]);
    }

    #[test]
    fn failed_intent_aborts_the_rest_and_keeps_earlier_changes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_created().unwrap();
        let kind = store.model().kind("Item").unwrap();

        let err = store
            .execute_transaction(&[
                RowIntent::added(&kind, item(2, "two")),
                RowIntent::added(&kind, item(1, "dup")),
                RowIntent::added(&kind, item(3, "three")),
            ])
            .unwrap_err();
        assert!(matches!(err, CoreError::BatchAborted { applied: 1, .. }));
        assert!(err.is_duplicate_key());

        store.clear();
        let names: Vec<_> = store.tables(&kind)[0]
            .rows
            .iter()
            .map(|r| r[1].clone())
            .collect();
        assert_eq!(names, vec![Value::from("seeded"), Value::from("two")]);
    }

    #[test]
    fn generator_is_shared_with_the_table() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.ensure_created().unwrap();
        let kind = store.model().kind("Item").unwrap();

        let generator = store.integer_value_generator(&kind, "Id").unwrap();
        assert_eq!(generator.current(), 1);
        store
            .execute_transaction(&[RowIntent::added(&kind, item(0, "generated"))])
            .unwrap();
        assert_eq!(generator.current(), 2);
        assert!(store.integer_value_generator(&kind, "Name").is_err());
        assert!(store.integer_value_generator(&kind, "Missing").is_err());
        assert!(store.tables(&kind)[0].rows.contains(&item(2, "generated")));
    }

    #[test]
    fn ensure_deleted_and_exists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        assert!(!store.exists().unwrap());
        store.ensure_created().unwrap();
        assert!(store.exists().unwrap());

        assert!(store.ensure_deleted().unwrap());
        assert!(!store.exists().unwrap());
        assert!(!store.ensure_deleted().unwrap());
        assert!(store.ensure_created().unwrap());
    }
}

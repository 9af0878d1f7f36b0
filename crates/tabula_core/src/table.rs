//! One table: the in-memory rows of an entity kind and their file.

use crate::config::Config;
use crate::convert::RowConverter;
use crate::error::{ConcurrencyConflict, ConflictKind, ConflictingColumn, CoreError, CoreResult};
use crate::generator::IntegerValueGenerator;
use crate::intent::RowIntent;
use crate::model::{needs_generated_value, validate_row, EntityKind, ValueGenerated};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tabula_codec::{Key, Row, RowFormat, RowMap};
use tabula_storage::{table_file_path, DefaultFileManager, EncryptedFileManager, FileManager};
use tracing::{debug, warn};

/// What happened when a table was hydrated from its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read; it held `rows` rows. A missing file holds none.
    Loaded {
        /// Number of rows read.
        rows: usize,
    },
    /// The file could not be read or parsed. The table started empty.
    Failed {
        /// Why loading failed.
        reason: String,
    },
}

/// The rows of one entity kind, keyed by primary key.
///
/// A table is hydrated once, when opened, and written back as a whole by
/// [`Table::save`]. Rows are held in domain form; conversion to the stored
/// form happens on save and load.
///
/// Tables are not synchronized; the store serializes access.
#[derive(Debug)]
pub struct Table {
    kind: Arc<EntityKind>,
    rows: RowMap,
    file: Box<dyn FileManager>,
    format: Box<dyn RowFormat>,
    converter: RowConverter,
    generators: HashMap<usize, Arc<IntegerValueGenerator>>,
    sensitive_logging: bool,
    outcome: LoadOutcome,
}

impl Table {
    /// Opens the table of `kind` at the location described by `config`.
    #[must_use]
    pub fn open(kind: Arc<EntityKind>, config: &Config) -> Self {
        let file = file_manager_for(&kind, config);
        Self::with_storage(kind, file, config.format.build(), config.sensitive_logging)
    }

    /// Opens a table over an explicit file manager and format.
    ///
    /// A file that cannot be read or parsed is logged and yields an empty
    /// table; see [`Table::load_outcome`].
    #[must_use]
    pub fn with_storage(
        kind: Arc<EntityKind>,
        file: Box<dyn FileManager>,
        format: Box<dyn RowFormat>,
        sensitive_logging: bool,
    ) -> Self {
        let converter = RowConverter::for_kind(&kind);
        let (rows, outcome) = match load(&kind, file.as_ref(), format.as_ref(), &converter) {
            Ok(rows) => {
                debug!(
                    table = kind.table_name(),
                    path = %file.path().display(),
                    rows = rows.len(),
                    "table hydrated"
                );
                let outcome = LoadOutcome::Loaded { rows: rows.len() };
                (rows, outcome)
            }
            Err(e) => {
                warn!(
                    table = kind.table_name(),
                    path = %file.path().display(),
                    error = %e,
                    "table file could not be loaded, starting empty"
                );
                (RowMap::new(), LoadOutcome::Failed { reason: e.to_string() })
            }
        };

        Self {
            kind,
            rows,
            file,
            format,
            converter,
            generators: HashMap::new(),
            sensitive_logging,
            outcome,
        }
    }

    /// Returns the entity kind the table was opened for.
    #[must_use]
    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the row stored under `key`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&Row> {
        self.rows.get(key)
    }

    /// Returns whether a row is stored under `key`.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.rows.contains_key(key)
    }

    /// Returns how hydration went.
    #[must_use]
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    /// Returns the location of the table file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns a copy of every row, in key order.
    #[must_use]
    pub fn snapshot_rows(&self) -> Vec<Row> {
        self.rows.values().cloned().collect()
    }

    /// Returns the value generator of the column at `column`.
    ///
    /// The generator is created on first use and seeded from every stored
    /// row.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or is not an integer
    /// column.
    pub fn integer_value_generator(
        &mut self,
        column: usize,
    ) -> CoreResult<Arc<IntegerValueGenerator>> {
        let property = self.kind.properties().get(column).ok_or_else(|| {
            CoreError::unknown_column(self.kind.name(), format!("#{column}"))
        })?;
        if !property.value_type().is_integer() {
            return Err(CoreError::invalid_operation(format!(
                "{}.{} is not an integer column",
                self.kind.name(),
                property.name()
            )));
        }

        let rows = &self.rows;
        let generator = self.generators.entry(column).or_insert_with(|| {
            let generator = IntegerValueGenerator::new(column);
            rows.values().for_each(|row| generator.observe(row));
            Arc::new(generator)
        });
        Ok(Arc::clone(generator))
    }

    /// Inserts the intent's row.
    ///
    /// Generated columns holding null or zero receive the next value of
    /// their generator.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if the key is taken, or
    /// [`CoreError::InvalidRow`] if the row does not fit the kind. The
    /// table is unchanged on error.
    pub fn create(&mut self, intent: &RowIntent) -> CoreResult<()> {
        self.check_slots(&intent.current)?;

        let mut row = intent.current.clone();
        let generated: Vec<usize> = self
            .kind
            .properties()
            .iter()
            .enumerate()
            .filter(|(i, p)| {
                p.value_generated() == ValueGenerated::OnAdd && needs_generated_value(&row[*i])
            })
            .map(|(i, _)| i)
            .collect();
        for column in generated {
            let value_type = self.kind.properties()[column].value_type().clone();
            row[column] = self.integer_value_generator(column)?.next_value(&value_type)?;
        }

        validate_row(self.kind.name(), self.kind.properties(), &row)?;
        let row: Row = row
            .iter()
            .zip(self.kind.properties())
            .map(|(value, property)| property.value_comparer().snapshot(value))
            .collect();

        let key = self.kind.key_of(&row)?;
        if self.rows.contains_key(&key) {
            return Err(CoreError::duplicate_key(self.kind.name(), self.describe(&key)));
        }
        self.observe(&row);
        self.rows.insert(key, row);
        Ok(())
    }

    /// Removes the row with the intent's key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConcurrencyConflict`] if the row is missing or
    /// a concurrency token differs from the intent's original value. The
    /// table is unchanged on error.
    pub fn delete(&mut self, intent: &RowIntent) -> CoreResult<()> {
        self.check_slots(&intent.current)?;
        let key = self.kind.key_of(&intent.current)?;
        let stored = self
            .rows
            .get(&key)
            .ok_or_else(|| self.conflict(&key, ConflictKind::RowMissing))?;

        let conflicts = self.token_conflicts(stored, intent);
        if !conflicts.is_empty() {
            return Err(self.conflict(&key, ConflictKind::TokensChanged(conflicts)));
        }
        self.rows.remove(&key);
        Ok(())
    }

    /// Updates the row with the intent's key.
    ///
    /// Columns marked modified take the intent's current value; the others
    /// keep the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConcurrencyConflict`] if the row is missing or
    /// a concurrency token differs from the intent's original value, or
    /// [`CoreError::InvalidRow`] if the result does not fit the kind. The
    /// table is unchanged on error.
    pub fn update(&mut self, intent: &RowIntent) -> CoreResult<()> {
        self.check_slots(&intent.current)?;
        let key = self.kind.key_of(&intent.current)?;
        let stored = self
            .rows
            .get(&key)
            .ok_or_else(|| self.conflict(&key, ConflictKind::RowMissing))?;

        let conflicts = self.token_conflicts(stored, intent);
        if !conflicts.is_empty() {
            return Err(self.conflict(&key, ConflictKind::TokensChanged(conflicts)));
        }

        let row: Row = stored
            .iter()
            .zip(self.kind.properties())
            .enumerate()
            .map(|(i, (old, property))| {
                if intent.is_modified(i) {
                    property.value_comparer().snapshot(&intent.current[i])
                } else {
                    old.clone()
                }
            })
            .collect();
        validate_row(self.kind.name(), self.kind.properties(), &row)?;

        self.observe(&row);
        self.rows.insert(key, row);
        Ok(())
    }

    /// Writes every row to the table file, replacing its content.
    ///
    /// # Errors
    ///
    /// Returns an error if a row cannot be converted or serialized, or the
    /// file cannot be written.
    pub fn save(&self) -> CoreResult<()> {
        let layout = self.kind.provider_layout();
        let blob = if self.converter.is_identity() {
            self.format.serialize(layout, &self.rows)?
        } else {
            let mut stored = RowMap::new();
            for row in self.rows.values() {
                let row = self.converter.to_provider(row)?;
                stored.insert(layout.key_of(&row)?, row);
            }
            self.format.serialize(layout, &stored)?
        };

        self.file.write(&blob)?;
        debug!(
            table = self.kind.table_name(),
            path = %self.file.path().display(),
            rows = self.rows.len(),
            bytes = blob.len(),
            "table saved"
        );
        Ok(())
    }

    fn check_slots(&self, row: &Row) -> CoreResult<()> {
        let expected = self.kind.properties().len();
        if row.len() == expected {
            Ok(())
        } else {
            Err(CoreError::invalid_row(
                self.kind.name(),
                format!("expected {expected} values, got {}", row.len()),
            ))
        }
    }

    fn token_conflicts(&self, stored: &Row, intent: &RowIntent) -> Vec<ConflictingColumn> {
        self.kind
            .properties()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_concurrency_token())
            .filter_map(|(i, property)| {
                let expected = intent.original_value(i);
                if property.value_comparer().equals(&stored[i], expected) {
                    return None;
                }
                Some(ConflictingColumn {
                    name: property.name().to_string(),
                    stored_value: self.sensitive_logging.then(|| stored[i].to_string()),
                    expected_value: self.sensitive_logging.then(|| expected.to_string()),
                })
            })
            .collect()
    }

    fn conflict(&self, key: &Key, kind: ConflictKind) -> CoreError {
        ConcurrencyConflict {
            entity: self.kind.name().to_string(),
            key: self.describe(key),
            kind,
        }
        .into()
    }

    fn describe(&self, key: &Key) -> Option<String> {
        self.sensitive_logging.then(|| key.to_string())
    }

    fn observe(&self, row: &Row) {
        for generator in self.generators.values() {
            generator.observe(row);
        }
    }
}

/// Builds the file manager of `kind`'s table.
pub(crate) fn file_manager_for(kind: &EntityKind, config: &Config) -> Box<dyn FileManager> {
    let path = table_file_path(
        config.root_dir(),
        &config.namespace,
        kind.table_name(),
        config.format.extension(),
    );
    let plain = Box::new(DefaultFileManager::new(path));
    match &config.encryption_key {
        Some(key) => Box::new(EncryptedFileManager::new(plain, key)),
        None => plain,
    }
}

fn load(
    kind: &EntityKind,
    file: &dyn FileManager,
    format: &dyn RowFormat,
    converter: &RowConverter,
) -> CoreResult<RowMap> {
    let blob = file.read()?;
    let mut stored = RowMap::new();
    format.deserialize(kind.provider_layout(), &blob, &mut stored)?;
    if converter.is_identity() {
        return Ok(stored);
    }

    let mut rows = RowMap::new();
    for row in stored.into_values() {
        let row = converter.from_provider(&row)?;
        rows.insert(kind.key_of(&row)?, row);
    }
    Ok(rows)
}

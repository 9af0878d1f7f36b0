//! Row intents: the change requests a batch is made of.

use crate::model::EntityKind;
use std::sync::Arc;
use tabula_codec::{Row, Value};

/// What an intent does to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentState {
    /// Insert a new row.
    Added,
    /// Update an existing row.
    Modified,
    /// Remove an existing row.
    Deleted,
}

/// A request to create, update or delete one row.
///
/// `current` holds the values the caller wants stored. `original` holds,
/// per column, the value the caller last read; `None` means it equals the
/// current value. Originals of concurrency tokens are compared with the
/// stored row on update and delete. On update only columns marked in
/// `modified` are taken from `current`.
///
/// # Example
///
/// ```
/// use tabula_codec::{Value, ValueType};
/// use tabula_core::{EntityKind, Model, Property, RowIntent};
///
/// let model = Model::builder()
///     .entity(
///         EntityKind::builder("Blog")
///             .property(Property::new("Id", ValueType::Int32))
///             .property(Property::new("Url", ValueType::Text))
///             .property(Property::new("Version", ValueType::Int32).concurrency_token())
///             .key(["Id"]),
///     )
///     .build()
///     .unwrap();
/// let blog = model.kind("Blog").unwrap();
///
/// let update = RowIntent::modified(
///     &blog,
///     vec![Value::Int32(1), Value::from("https://new"), Value::Int32(2)],
/// )
/// .with_original(2, Value::Int32(1))
/// .mark_modified(1)
/// .mark_modified(2);
/// assert_eq!(update.original_value(2), &Value::Int32(1));
/// ```
#[derive(Debug, Clone)]
pub struct RowIntent {
    /// The entity kind of the row.
    pub kind: Arc<EntityKind>,
    /// What to do.
    pub state: IntentState,
    /// Values to store.
    pub current: Row,
    /// Last read values, `None` where equal to `current`.
    pub original: Vec<Option<Value>>,
    /// Columns whose current value should be stored on update.
    pub modified: Vec<bool>,
    /// Whether another intent in the batch has the same identity.
    ///
    /// The deleted side of such a pair is skipped; the other side replaces
    /// the stored row.
    pub shared_identity: bool,
}

impl RowIntent {
    fn new(kind: &Arc<EntityKind>, state: IntentState, current: Row) -> Self {
        let len = current.len();
        Self {
            kind: Arc::clone(kind),
            state,
            current,
            original: vec![None; len],
            modified: vec![false; len],
            shared_identity: false,
        }
    }

    /// Creates an intent to insert `row`.
    #[must_use]
    pub fn added(kind: &Arc<EntityKind>, row: Row) -> Self {
        Self::new(kind, IntentState::Added, row)
    }

    /// Creates an intent to update the row with `row`'s key.
    ///
    /// No column is marked modified yet.
    #[must_use]
    pub fn modified(kind: &Arc<EntityKind>, row: Row) -> Self {
        Self::new(kind, IntentState::Modified, row)
    }

    /// Creates an intent to delete the row with `row`'s key.
    #[must_use]
    pub fn deleted(kind: &Arc<EntityKind>, row: Row) -> Self {
        Self::new(kind, IntentState::Deleted, row)
    }

    /// Records the value the caller last read for `column`.
    #[must_use]
    pub fn with_original(mut self, column: usize, value: Value) -> Self {
        if let Some(slot) = self.original.get_mut(column) {
            *slot = Some(value);
        }
        self
    }

    /// Marks `column` as modified.
    #[must_use]
    pub fn mark_modified(mut self, column: usize) -> Self {
        if let Some(slot) = self.modified.get_mut(column) {
            *slot = true;
        }
        self
    }

    /// Marks every column as modified.
    #[must_use]
    pub fn mark_all_modified(mut self) -> Self {
        self.modified.iter_mut().for_each(|m| *m = true);
        self
    }

    /// Flags the intent as one side of a shared identity pair.
    #[must_use]
    pub fn shared_identity(mut self) -> Self {
        self.shared_identity = true;
        self
    }

    /// Returns the value the caller last read for `column`.
    ///
    /// # Panics
    ///
    /// Panics if `column` is out of range for the intent's row.
    #[must_use]
    pub fn original_value(&self, column: usize) -> &Value {
        match self.original.get(column) {
            Some(Some(value)) => value,
            _ => &self.current[column],
        }
    }

    /// Returns whether `column` is marked modified.
    #[must_use]
    pub fn is_modified(&self, column: usize) -> bool {
        self.modified.get(column).copied().unwrap_or(false)
    }
}

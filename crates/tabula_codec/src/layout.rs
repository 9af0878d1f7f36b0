//! Table layout: what a format needs to know to read and write rows.

use crate::error::{CodecError, CodecResult};
use crate::row::{Key, Row};
use crate::value::ValueType;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name, used as the header or field name on disk.
    pub name: String,
    /// Declared type of the column.
    pub value_type: ValueType,
}

impl Column {
    /// Creates a column.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

/// Column names and types of a table plus the positions of its key columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    columns: Vec<Column>,
    key: Vec<usize>,
}

impl RowLayout {
    /// Creates a layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a key position is out of range, the key is
    /// empty, or two columns share a name.
    pub fn new(columns: Vec<Column>, key: Vec<usize>) -> CodecResult<Self> {
        if key.is_empty() {
            return Err(CodecError::invalid_structure("layout has no key columns"));
        }
        if let Some(bad) = key.iter().find(|&&i| i >= columns.len()) {
            return Err(CodecError::invalid_structure(format!(
                "key position {bad} out of range for {} columns",
                columns.len()
            )));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CodecError::invalid_structure(format!(
                    "duplicate column {}",
                    column.name
                )));
            }
        }
        Ok(Self { columns, key })
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the positions of the key columns.
    #[must_use]
    pub fn key_positions(&self) -> &[usize] {
        &self.key
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns whether the layout has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the position of the column called `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Builds the key of `row`.
    ///
    /// # Errors
    ///
    /// Returns an error if the row is shorter than the layout.
    pub fn key_of(&self, row: &Row) -> CodecResult<Key> {
        if row.len() != self.columns.len() {
            return Err(CodecError::invalid_structure(format!(
                "row has {} values, layout has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        Ok(Key(self.key.iter().map(|&i| row[i].clone()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn layout() -> RowLayout {
        RowLayout::new(
            vec![
                Column::new("Tenant", ValueType::Text),
                Column::new("Id", ValueType::Int32),
                Column::new("Name", ValueType::Text),
            ],
            vec![0, 1],
        )
        .unwrap()
    }

    #[test]
    fn key_of_picks_key_columns_in_key_order() {
        let row = vec![Value::from("acme"), Value::Int32(4), Value::from("n")];
        assert_eq!(
            layout().key_of(&row).unwrap(),
            Key::new(vec![Value::from("acme"), Value::Int32(4)])
        );
    }

    #[test]
    fn key_of_rejects_short_rows() {
        assert!(layout().key_of(&vec![Value::Int32(1)]).is_err());
    }

    #[test]
    fn rejects_invalid_layouts() {
        let cols = || vec![Column::new("Id", ValueType::Int32)];
        assert!(RowLayout::new(cols(), vec![]).is_err());
        assert!(RowLayout::new(cols(), vec![1]).is_err());
        let dup = vec![
            Column::new("Id", ValueType::Int32),
            Column::new("Id", ValueType::Text),
        ];
        assert!(RowLayout::new(dup, vec![0]).is_err());
    }

    #[test]
    fn position_by_name() {
        assert_eq!(layout().position("Name"), Some(2));
        assert_eq!(layout().position("Missing"), None);
    }
}

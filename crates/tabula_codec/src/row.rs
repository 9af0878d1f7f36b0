//! Rows, keys and the ordered row map.

use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One table row: a value per declared column, in declaration order.
pub type Row = Vec<Value>;

/// Rows of one table ordered by key.
///
/// The ordering makes serialized output deterministic.
pub type RowMap = BTreeMap<Key, Row>;

/// A primary key: the values of a row's key columns, in key order.
///
/// Equality, hashing and ordering are structural, so composite keys work
/// without extra effort.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub Vec<Value>);

impl Key {
    /// Creates a key from its component values.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Creates a single-column key.
    #[must_use]
    pub fn single(value: impl Into<Value>) -> Self {
        Self(vec![value.into()])
    }

    /// Returns the key's component values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("}")
    }
}

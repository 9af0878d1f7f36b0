//! Per-column integer value generation.

use crate::error::{CoreError, CoreResult};
use std::sync::atomic::{AtomicI64, Ordering};
use tabula_codec::{Row, Value, ValueType};

/// A monotonic integer sequence for one column of one table.
///
/// The sequence only proposes values; uniqueness is still enforced by the
/// table's key. The generator observes every row the table stores, so the
/// next value is always greater than any value seen in the column.
///
/// Generators are shared as `Arc` and may be used outside the store lock.
///
/// # Example
///
/// ```
/// use tabula_codec::Value;
/// use tabula_core::IntegerValueGenerator;
///
/// let generator = IntegerValueGenerator::new(0);
/// for id in [5, 12, 3] {
///     generator.observe(&vec![Value::Int32(id)]);
/// }
/// assert_eq!(generator.next().unwrap(), 13);
/// ```
#[derive(Debug)]
pub struct IntegerValueGenerator {
    column: usize,
    current: AtomicI64,
}

impl IntegerValueGenerator {
    /// Creates a generator for the column at `column`, starting at zero.
    #[must_use]
    pub fn new(column: usize) -> Self {
        Self {
            column,
            current: AtomicI64::new(0),
        }
    }

    /// Returns the column the generator serves.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Returns the highest value issued or observed so far.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Raises the sequence to the row's value in the generator's column.
    ///
    /// Null and non-integer values are ignored.
    pub fn observe(&self, row: &Row) {
        if let Some(n) = row.get(self.column).and_then(Value::as_i64) {
            self.current.fetch_max(n, Ordering::SeqCst);
        }
    }

    /// Advances the sequence and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns an error once the sequence has reached `i64::MAX`. The
    /// sequence is left where it was.
    pub fn next(&self) -> CoreResult<i64> {
        self.current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(|_| CoreError::invalid_operation("sequence exhausted"))
    }

    /// Advances the sequence and returns the new value as `value_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence is exhausted, the value does not
    /// fit the type or the type is not an integer type.
    pub fn next_value(&self, value_type: &ValueType) -> CoreResult<Value> {
        let n = self.next()?;
        integer_value(n, value_type).ok_or_else(|| {
            CoreError::invalid_operation(format!("generated value {n} does not fit {value_type}"))
        })
    }
}

fn integer_value(n: i64, value_type: &ValueType) -> Option<Value> {
    match value_type {
        ValueType::Nullable(inner) => integer_value(n, inner),
        ValueType::UInt8 => u8::try_from(n).ok().map(Value::UInt8),
        ValueType::Int32 => i32::try_from(n).ok().map(Value::Int32),
        ValueType::Int64 => Some(Value::Int64(n)),
        _ => None,
    }
}

//! Value comparers: how a column decides that two values are the same.
//!
//! Every property carries a comparer. Tables use it to check concurrency
//! tokens and to take the snapshot that is stored, so a row in a table
//! never aliases a value the caller still holds.

use std::fmt;
use tabula_codec::Value;

/// Equality and snapshot strategy of one column.
pub trait ValueComparer: Send + Sync + fmt::Debug {
    /// Returns whether two values of the column are equal.
    fn equals(&self, a: &Value, b: &Value) -> bool;

    /// Returns an independent copy of `value` to store.
    fn snapshot(&self, value: &Value) -> Value {
        value.clone()
    }
}

/// Structural equality of [`Value`], element by element for arrays.
///
/// The default comparer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralComparer;

impl ValueComparer for StructuralComparer {
    fn equals(&self, a: &Value, b: &Value) -> bool {
        a == b
    }
}

/// Compares text ignoring case. Other values compare structurally.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveTextComparer;

impl ValueComparer for CaseInsensitiveTextComparer {
    fn equals(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Text(a), Value::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_arrays() {
        let a = Value::from(vec![1, 2]);
        let b = Value::from(vec![1, 2]);
        let c = Value::from(vec![2, 1]);
        assert!(StructuralComparer.equals(&a, &b));
        assert!(!StructuralComparer.equals(&a, &c));
        assert_eq!(StructuralComparer.snapshot(&a), a);
    }

    #[test]
    fn case_insensitive_text() {
        let cmp = CaseInsensitiveTextComparer;
        assert!(cmp.equals(&Value::from("Alice"), &Value::from("ALICE")));
        assert!(!cmp.equals(&Value::from("Alice"), &Value::from("Bob")));
        assert!(cmp.equals(&Value::Int32(1), &Value::Int32(1)));
        assert!(!cmp.equals(&Value::Null, &Value::from("")));
    }
}

//! Dynamic cell value and declared column types.

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

/// A dynamic cell value.
///
/// Values have a structural total order and hash, so rows and keys built
/// from them can live in ordered and hashed collections. Floats are ordered
/// with [`f64::total_cmp`] and hashed by bit pattern. Date-times compare by
/// instant, so the same moment at two offsets is equal.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Unsigned byte.
    UInt8(u8),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// Double precision float.
    Float64(f64),
    /// UTF-8 text.
    Text(String),
    /// Instant with a fixed UTC offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// Signed time span.
    Duration(TimeDelta),
    /// UUID.
    Uuid(Uuid),
    /// Enumeration member, by name.
    Enum(String),
    /// Sequence of values.
    Array(Vec<Value>),
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::UInt8(_) => 2,
            Value::Int32(_) => 3,
            Value::Int64(_) => 4,
            Value::Float64(_) => 5,
            Value::Text(_) => 6,
            Value::DateTimeOffset(_) => 7,
            Value::Duration(_) => 8,
            Value::Uuid(_) => 9,
            Value::Enum(_) => 10,
            Value::Array(_) => 11,
        }
    }

    /// Check if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as a widened integer, if it is one of the integer
    /// variants.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::UInt8(n) => Some(i64::from(*n)),
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float, if it is one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as text, if it is text or an enum member.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a UUID, if it is one.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns a short name of this value's variant.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::UInt8(_) => "uint8",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Text(_) => "text",
            Value::DateTimeOffset(_) => "datetimeoffset",
            Value::Duration(_) => "duration",
            Value::Uuid(_) => "uuid",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::UInt8(a), Value::UInt8(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => a.cmp(b),
            (Value::Duration(a), Value::Duration(b)) => a.cmp(b),
            (Value::Uuid(a), Value::Uuid(b)) => a.cmp(b),
            (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::UInt8(n) => n.hash(state),
            Value::Int32(n) => n.hash(state),
            Value::Int64(n) => n.hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Text(s) | Value::Enum(s) => s.hash(state),
            Value::DateTimeOffset(dt) => {
                let utc = dt.with_timezone(&Utc);
                utc.timestamp().hash(state);
                utc.timestamp_subsec_nanos().hash(state);
            }
            Value::Duration(d) => d.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::Array(items) => items.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::field::encode(self))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UInt8(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(v)
    }
}

impl From<TimeDelta> for Value {
    fn from(v: TimeDelta) -> Self {
        Value::Duration(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

/// An enumeration type: a name and its ordered member names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    name: String,
    members: Vec<String>,
}

impl EnumType {
    /// Creates an enumeration type.
    ///
    /// The first member is the type's zero value.
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the member names in declaration order.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Returns whether `member` names a member of this type.
    #[must_use]
    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }
}

/// The declared type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Boolean.
    Bool,
    /// Unsigned byte.
    UInt8,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Double precision float.
    Float64,
    /// UTF-8 text.
    Text,
    /// Instant with a fixed UTC offset.
    DateTimeOffset,
    /// Signed time span.
    Duration,
    /// UUID.
    Uuid,
    /// Enumeration.
    Enum(Arc<EnumType>),
    /// The inner type or null.
    Nullable(Box<ValueType>),
    /// A sequence of the element type.
    Array(Box<ValueType>),
}

impl ValueType {
    /// Shorthand for `ValueType::Nullable(Box::new(inner))`.
    #[must_use]
    pub fn nullable(inner: ValueType) -> Self {
        ValueType::Nullable(Box::new(inner))
    }

    /// Shorthand for `ValueType::Array(Box::new(element))`.
    #[must_use]
    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    /// Shorthand for an enumeration type.
    pub fn enumeration<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueType::Enum(Arc::new(EnumType::new(name, members)))
    }

    /// Returns whether null is a legal value of this type.
    ///
    /// Arrays count as nullable: an empty cell reads back as null.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Nullable(_) | ValueType::Array(_))
    }

    /// Returns whether this is one of the integer types, looking through
    /// `Nullable`.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        match self {
            ValueType::UInt8 | ValueType::Int32 | ValueType::Int64 => true,
            ValueType::Nullable(inner) => inner.is_integer(),
            _ => false,
        }
    }

    /// Returns the value an empty cell decodes to.
    ///
    /// Enumerations without members have no zero value and yield null.
    #[must_use]
    pub fn zero_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::UInt8 => Value::UInt8(0),
            ValueType::Int32 => Value::Int32(0),
            ValueType::Int64 => Value::Int64(0),
            ValueType::Float64 => Value::Float64(0.0),
            ValueType::Text => Value::Text(String::new()),
            ValueType::DateTimeOffset => {
                Value::DateTimeOffset(DateTime::<Utc>::default().fixed_offset())
            }
            ValueType::Duration => Value::Duration(TimeDelta::zero()),
            ValueType::Uuid => Value::Uuid(Uuid::nil()),
            ValueType::Enum(e) => e
                .members()
                .first()
                .map_or(Value::Null, |m| Value::Enum(m.clone())),
            ValueType::Nullable(_) | ValueType::Array(_) => Value::Null,
        }
    }

    /// Returns whether `value` is an acceptable instance of this type.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Nullable(_) | ValueType::Array(_), Value::Null) => true,
            (ValueType::Nullable(inner), v) => inner.accepts(v),
            (ValueType::Array(element), Value::Array(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::UInt8, Value::UInt8(_))
            | (ValueType::Int32, Value::Int32(_))
            | (ValueType::Int64, Value::Int64(_))
            | (ValueType::Float64, Value::Float64(_))
            | (ValueType::Text, Value::Text(_))
            | (ValueType::DateTimeOffset, Value::DateTimeOffset(_))
            | (ValueType::Duration, Value::Duration(_))
            | (ValueType::Uuid, Value::Uuid(_)) => true,
            (ValueType::Enum(e), Value::Enum(m)) => e.contains(m),
            _ => false,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => f.write_str("bool"),
            ValueType::UInt8 => f.write_str("uint8"),
            ValueType::Int32 => f.write_str("int32"),
            ValueType::Int64 => f.write_str("int64"),
            ValueType::Float64 => f.write_str("float64"),
            ValueType::Text => f.write_str("text"),
            ValueType::DateTimeOffset => f.write_str("datetimeoffset"),
            ValueType::Duration => f.write_str("duration"),
            ValueType::Uuid => f.write_str("uuid"),
            ValueType::Enum(e) => write!(f, "enum {}", e.name()),
            ValueType::Nullable(inner) => write!(f, "{inner}?"),
            ValueType::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn different_variants_are_ordered_by_rank() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::Int32(100) < Value::Int64(1));
        assert!(Value::Text("z".into()) < Value::Uuid(Uuid::nil()));
    }

    #[test]
    fn floats_have_total_order() {
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
        assert!(Value::Float64(-0.0) < Value::Float64(0.0));
        assert!(Value::Float64(1.5) < Value::Float64(f64::INFINITY));
    }

    #[test]
    fn same_instant_at_different_offsets_is_equal() {
        let a = DateTime::parse_from_rfc3339("2024-01-01T12:00:00+02:00").unwrap();
        let b = DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z").unwrap();
        let (a, b) = (Value::from(a), Value::from(b));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn equal_values_hash_equal() {
        let a = Value::Array(vec![Value::Int32(1), Value::Text("x".into())]);
        assert_eq!(hash_of(&a), hash_of(&a.clone()));
        assert_ne!(hash_of(&Value::Int32(1)), hash_of(&Value::Int64(1)));
    }

    #[test]
    fn zero_values() {
        assert_eq!(ValueType::Int32.zero_value(), Value::Int32(0));
        assert_eq!(ValueType::Text.zero_value(), Value::Text(String::new()));
        assert_eq!(
            ValueType::enumeration("Color", ["Red", "Green"]).zero_value(),
            Value::Enum("Red".into())
        );
        assert_eq!(ValueType::nullable(ValueType::Int32).zero_value(), Value::Null);
        assert_eq!(ValueType::array(ValueType::Int32).zero_value(), Value::Null);
        assert_eq!(
            ValueType::DateTimeOffset.zero_value().to_string(),
            "1970-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn accepts_checks_shape() {
        let color = ValueType::enumeration("Color", ["Red", "Green"]);
        assert!(color.accepts(&Value::Enum("Green".into())));
        assert!(!color.accepts(&Value::Enum("Blue".into())));
        assert!(!ValueType::Int32.accepts(&Value::Null));
        assert!(ValueType::nullable(ValueType::Int32).accepts(&Value::Null));
        assert!(ValueType::array(ValueType::Int32)
            .accepts(&Value::Array(vec![Value::Int32(1), Value::Int32(2)])));
        assert!(!ValueType::array(ValueType::Int32).accepts(&Value::Array(vec![Value::Null])));
    }

    #[test]
    fn option_and_vec_conversions() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(3)), Value::Int32(3));
        assert_eq!(
            Value::from(vec![1i64, 2]),
            Value::Array(vec![Value::Int64(1), Value::Int64(2)])
        );
    }

    #[test]
    fn value_type_display() {
        let t = ValueType::array(ValueType::nullable(ValueType::Int32));
        assert_eq!(t.to_string(), "int32?[]");
    }
}

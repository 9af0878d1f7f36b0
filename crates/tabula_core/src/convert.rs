//! Value converters: domain values to and from the values that are stored.
//!
//! A property with a converter is stored as the converter's provider type.
//! Null never reaches a converter; it is stored and loaded as null.

use crate::error::{CoreError, CoreResult};
use crate::model::EntityKind;
use std::fmt;
use std::sync::Arc;
use tabula_codec::{EnumType, Row, Value, ValueType};

/// Converts one column between its domain and provider representation.
pub trait ValueConverter: Send + Sync + fmt::Debug {
    /// Returns the type values are stored as.
    fn provider_type(&self) -> ValueType;

    /// Converts a domain value to its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conversion`] if the value cannot be converted.
    fn to_provider(&self, value: &Value) -> CoreResult<Value>;

    /// Converts a stored value back to its domain form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conversion`] if the value cannot be converted.
    fn from_provider(&self, value: &Value) -> CoreResult<Value>;
}

/// Stores booleans as `Int32` 0 and 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolToIntConverter;

impl ValueConverter for BoolToIntConverter {
    fn provider_type(&self) -> ValueType {
        ValueType::Int32
    }

    fn to_provider(&self, value: &Value) -> CoreResult<Value> {
        match value {
            Value::Bool(b) => Ok(Value::Int32(i32::from(*b))),
            other => Err(CoreError::conversion("", format!("expected bool, got {}", other.type_name()))),
        }
    }

    fn from_provider(&self, value: &Value) -> CoreResult<Value> {
        match value {
            Value::Int32(0) => Ok(Value::Bool(false)),
            Value::Int32(1) => Ok(Value::Bool(true)),
            other => Err(CoreError::conversion("", format!("expected 0 or 1, got {other}"))),
        }
    }
}

/// Stores enumeration members as their `Int32` ordinal.
#[derive(Debug, Clone)]
pub struct EnumToOrdinalConverter {
    enum_type: Arc<EnumType>,
}

impl EnumToOrdinalConverter {
    /// Creates a converter for `enum_type`.
    #[must_use]
    pub fn new(enum_type: Arc<EnumType>) -> Self {
        Self { enum_type }
    }
}

impl ValueConverter for EnumToOrdinalConverter {
    fn provider_type(&self) -> ValueType {
        ValueType::Int32
    }

    fn to_provider(&self, value: &Value) -> CoreResult<Value> {
        let position = value
            .as_text()
            .and_then(|name| self.enum_type.members().iter().position(|m| m == name))
            .ok_or_else(|| {
                CoreError::conversion("", format!("not a member of {}", self.enum_type.name()))
            })?;
        i32::try_from(position)
            .map(Value::Int32)
            .map_err(|e| CoreError::conversion("", e.to_string()))
    }

    fn from_provider(&self, value: &Value) -> CoreResult<Value> {
        value
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .and_then(|n| self.enum_type.members().get(n))
            .map(|m| Value::Enum(m.clone()))
            .ok_or_else(|| {
                CoreError::conversion(
                    "",
                    format!("{value} is not an ordinal of {}", self.enum_type.name()),
                )
            })
    }
}

type ConvertFn = dyn Fn(&Value) -> CoreResult<Value> + Send + Sync;

/// A converter built from two closures.
///
/// # Example
///
/// ```
/// use tabula_codec::{Value, ValueType};
/// use tabula_core::{FnConverter, ValueConverter};
///
/// // store text upper-cased, read it back lower-cased
/// let converter = FnConverter::new(
///     ValueType::Text,
///     |v| Ok(Value::from(v.as_text().unwrap_or_default().to_uppercase())),
///     |v| Ok(Value::from(v.as_text().unwrap_or_default().to_lowercase())),
/// );
/// assert_eq!(converter.to_provider(&Value::from("ab")).unwrap(), Value::from("AB"));
/// ```
#[derive(Clone)]
pub struct FnConverter {
    provider_type: ValueType,
    to: Arc<ConvertFn>,
    from: Arc<ConvertFn>,
}

impl FnConverter {
    /// Creates a converter storing values as `provider_type`.
    pub fn new<T, F>(provider_type: ValueType, to: T, from: F) -> Self
    where
        T: Fn(&Value) -> CoreResult<Value> + Send + Sync + 'static,
        F: Fn(&Value) -> CoreResult<Value> + Send + Sync + 'static,
    {
        Self {
            provider_type,
            to: Arc::new(to),
            from: Arc::new(from),
        }
    }
}

impl fmt::Debug for FnConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnConverter")
            .field("provider_type", &self.provider_type)
            .finish_non_exhaustive()
    }
}

impl ValueConverter for FnConverter {
    fn provider_type(&self) -> ValueType {
        self.provider_type.clone()
    }

    fn to_provider(&self, value: &Value) -> CoreResult<Value> {
        (self.to)(value)
    }

    fn from_provider(&self, value: &Value) -> CoreResult<Value> {
        (self.from)(value)
    }
}

/// Applies the converters of an entity kind to whole rows.
#[derive(Debug, Clone)]
pub struct RowConverter {
    columns: Vec<(String, Option<Arc<dyn ValueConverter>>)>,
}

impl RowConverter {
    /// Collects the converters of `kind`'s properties.
    #[must_use]
    pub fn for_kind(kind: &EntityKind) -> Self {
        Self {
            columns: kind
                .properties()
                .iter()
                .map(|p| (p.name().to_string(), p.value_converter().cloned()))
                .collect(),
        }
    }

    /// Returns whether no column has a converter.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.columns.iter().all(|(_, c)| c.is_none())
    }

    /// Converts a domain row to its stored form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conversion`] naming the first column that fails.
    pub fn to_provider(&self, row: &Row) -> CoreResult<Row> {
        self.apply(row, |c, v| c.to_provider(v))
    }

    /// Converts a stored row to its domain form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conversion`] naming the first column that fails.
    pub fn from_provider(&self, row: &Row) -> CoreResult<Row> {
        self.apply(row, |c, v| c.from_provider(v))
    }

    fn apply(
        &self,
        row: &Row,
        convert: impl Fn(&dyn ValueConverter, &Value) -> CoreResult<Value>,
    ) -> CoreResult<Row> {
        if row.len() != self.columns.len() {
            return Err(CoreError::conversion(
                "",
                format!("row has {} values, expected {}", row.len(), self.columns.len()),
            ));
        }

        row.iter()
            .zip(&self.columns)
            .map(|(value, (name, converter))| match converter {
                Some(converter) if !value.is_null() => {
                    convert(converter.as_ref(), value).map_err(|e| match e {
                        CoreError::Conversion { message, .. } => {
                            CoreError::conversion(name.clone(), message)
                        }
                        other => other,
                    })
                }
                _ => Ok(value.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKind, Model, Property};

    fn kind() -> Arc<EntityKind> {
        let color = ValueType::enumeration("Color", ["Red", "Green", "Blue"]);
        let ValueType::Enum(enum_type) = color.clone() else {
            unreachable!()
        };
        let model = Model::builder()
            .entity(
                EntityKind::builder("Widget")
                    .property(Property::new("Id", ValueType::Int32))
                    .property(
                        Property::new("Enabled", ValueType::nullable(ValueType::Bool))
                            .converter(BoolToIntConverter),
                    )
                    .property(
                        Property::new("Color", color).converter(EnumToOrdinalConverter::new(enum_type)),
                    )
                    .key(["Id"]),
            )
            .build()
            .unwrap();
        model.kind("Widget").unwrap()
    }

    #[test]
    fn converts_rows_both_ways() {
        let converter = RowConverter::for_kind(&kind());
        assert!(!converter.is_identity());

        let domain = vec![Value::Int32(1), Value::Bool(true), Value::Enum("Blue".into())];
        let stored = converter.to_provider(&domain).unwrap();
        assert_eq!(stored, vec![Value::Int32(1), Value::Int32(1), Value::Int32(2)]);
        assert_eq!(converter.from_provider(&stored).unwrap(), domain);
    }

    #[test]
    fn null_bypasses_converter() {
        let converter = RowConverter::for_kind(&kind());
        let domain = vec![Value::Int32(1), Value::Null, Value::Enum("Red".into())];
        let stored = converter.to_provider(&domain).unwrap();
        assert_eq!(stored[1], Value::Null);
    }

    #[test]
    fn failure_names_the_column() {
        let converter = RowConverter::for_kind(&kind());
        let stored = vec![Value::Int32(1), Value::Int32(7), Value::Int32(0)];
        match converter.from_provider(&stored).unwrap_err() {
            CoreError::Conversion { column, .. } => assert_eq!(column, "Enabled"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fn_converter() {
        let doubled = FnConverter::new(
            ValueType::Int64,
            |v| Ok(Value::Int64(v.as_i64().unwrap_or_default() * 2)),
            |v| Ok(Value::Int64(v.as_i64().unwrap_or_default() / 2)),
        );
        assert_eq!(doubled.provider_type(), ValueType::Int64);
        assert_eq!(doubled.to_provider(&Value::Int64(4)).unwrap(), Value::Int64(8));
        assert_eq!(doubled.from_provider(&Value::Int64(8)).unwrap(), Value::Int64(4));
    }
}

//! Binary tables in CBOR.
//!
//! ```text
//! {
//!   "version": 1,
//!   "columns": ["Id", "Name", ...],
//!   "rows":    [[1, "Alice", ...], ...]
//! }
//! ```
//!
//! Booleans, integers, floats and text are stored as native CBOR items.
//! UUIDs and `UInt8` arrays are byte strings. Every other type is stored
//! as its field codec text. Cells are decoded guided by the column type.

use super::{check_rows, column_positions, insert_row, RawTable, RowFormat};
use crate::error::{CodecError, CodecResult};
use crate::field;
use crate::layout::RowLayout;
use crate::row::RowMap;
use crate::value::{Value, ValueType};
use ciborium::value::{Integer, Value as Cbor};
use uuid::Uuid;

const VERSION: u8 = 1;

/// The CBOR table format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryFormat;

fn is_byte_array(ty: &ValueType) -> bool {
    match ty {
        ValueType::Array(element) => **element == ValueType::UInt8,
        ValueType::Nullable(inner) => is_byte_array(inner),
        _ => false,
    }
}

fn encode_cell(value: &Value, ty: &ValueType) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::UInt8(n) => Cbor::Integer(Integer::from(*n)),
        Value::Int32(n) => Cbor::Integer(Integer::from(*n)),
        Value::Int64(n) => Cbor::Integer(Integer::from(*n)),
        Value::Float64(f) => Cbor::Float(*f),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Uuid(u) => Cbor::Bytes(u.as_bytes().to_vec()),
        Value::Array(items) if is_byte_array(ty) => Cbor::Bytes(
            items
                .iter()
                .map(|item| match item {
                    Value::UInt8(b) => Some(*b),
                    _ => None,
                })
                .collect::<Option<Vec<u8>>>()
                .unwrap_or_default(),
        ),
        other => Cbor::Text(field::encode(other)),
    }
}

fn decode_cell(cell: Cbor, ty: &ValueType) -> CodecResult<Value> {
    let mismatch = |found: &Cbor| {
        CodecError::decoding(format!("expected {ty}, found {}", cbor_kind(found)))
    };

    match (ty, cell) {
        (_, Cbor::Null) => Ok(ty.zero_value()),
        (ValueType::Nullable(inner), cell) => decode_cell(cell, inner),
        (ValueType::Array(_), Cbor::Bytes(bytes)) if is_byte_array(ty) => {
            Ok(Value::Array(bytes.into_iter().map(Value::UInt8).collect()))
        }
        (ValueType::Bool, Cbor::Bool(b)) => Ok(Value::Bool(b)),
        (ValueType::UInt8, Cbor::Integer(i)) => u8::try_from(i)
            .map(Value::UInt8)
            .map_err(|e| CodecError::decoding(e.to_string())),
        (ValueType::Int32, Cbor::Integer(i)) => i32::try_from(i)
            .map(Value::Int32)
            .map_err(|e| CodecError::decoding(e.to_string())),
        (ValueType::Int64, Cbor::Integer(i)) => i64::try_from(i)
            .map(Value::Int64)
            .map_err(|e| CodecError::decoding(e.to_string())),
        (ValueType::Float64, Cbor::Float(f)) => Ok(Value::Float64(f)),
        #[allow(clippy::cast_precision_loss)]
        (ValueType::Float64, Cbor::Integer(i)) => Ok(Value::Float64(i128::from(i) as f64)),
        (ValueType::Uuid, Cbor::Bytes(bytes)) => Uuid::from_slice(&bytes)
            .map(Value::Uuid)
            .map_err(|e| CodecError::decoding(e.to_string())),
        (_, Cbor::Text(s)) => field::decode(&s, ty),
        (_, other) => Err(mismatch(&other)),
    }
}

fn cbor_kind(cell: &Cbor) -> &'static str {
    match cell {
        Cbor::Integer(_) => "integer",
        Cbor::Bytes(_) => "bytes",
        Cbor::Float(_) => "float",
        Cbor::Text(_) => "text",
        Cbor::Bool(_) => "bool",
        Cbor::Null => "null",
        Cbor::Tag(..) => "tag",
        Cbor::Array(_) => "array",
        Cbor::Map(_) => "map",
        _ => "unknown",
    }
}

/// The parsed envelope of a binary table.
struct Document {
    columns: Vec<String>,
    rows: Vec<Vec<Cbor>>,
}

fn parse(blob: &[u8]) -> CodecResult<Document> {
    let root: Cbor =
        ciborium::de::from_reader(blob).map_err(|e| CodecError::decoding(e.to_string()))?;
    let Cbor::Map(entries) = root else {
        return Err(CodecError::invalid_structure("binary table is not a map"));
    };

    let mut version = None;
    let mut columns = None;
    let mut rows = None;
    for (key, value) in entries {
        match (key.as_text(), value) {
            (Some("version"), Cbor::Integer(v)) => version = Some(i128::from(v)),
            (Some("columns"), Cbor::Array(names)) => {
                columns = Some(
                    names
                        .into_iter()
                        .map(|n| match n {
                            Cbor::Text(s) => Ok(s),
                            _ => Err(CodecError::invalid_structure("column name is not text")),
                        })
                        .collect::<CodecResult<Vec<_>>>()?,
                );
            }
            (Some("rows"), Cbor::Array(items)) => {
                rows = Some(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Cbor::Array(cells) => Ok(cells),
                            _ => Err(CodecError::invalid_structure("row is not an array")),
                        })
                        .collect::<CodecResult<Vec<_>>>()?,
                );
            }
            _ => {}
        }
    }

    match version {
        Some(v) if v == i128::from(VERSION) => {}
        Some(v) => {
            return Err(CodecError::invalid_structure(format!(
                "unsupported binary table version {v}"
            )))
        }
        None => return Err(CodecError::invalid_structure("missing version")),
    }
    let columns = columns.ok_or_else(|| CodecError::invalid_structure("missing columns"))?;
    let rows = rows.ok_or_else(|| CodecError::invalid_structure("missing rows"))?;

    if let Some(bad) = rows.iter().find(|r| r.len() != columns.len()) {
        return Err(CodecError::invalid_structure(format!(
            "row has {} cells, table has {} columns",
            bad.len(),
            columns.len()
        )));
    }
    Ok(Document { columns, rows })
}

impl RowFormat for BinaryFormat {
    fn name(&self) -> &'static str {
        "cbor"
    }

    fn extension(&self) -> &'static str {
        "cbor"
    }

    fn serialize(&self, layout: &RowLayout, rows: &RowMap) -> CodecResult<Vec<u8>> {
        check_rows(layout, rows)?;

        let columns = layout
            .columns()
            .iter()
            .map(|c| Cbor::Text(c.name.clone()))
            .collect();
        let rows = rows
            .values()
            .map(|row| {
                Cbor::Array(
                    row.iter()
                        .zip(layout.columns())
                        .map(|(value, column)| encode_cell(value, &column.value_type))
                        .collect(),
                )
            })
            .collect();
        let document = Cbor::Map(vec![
            (Cbor::Text("version".into()), Cbor::Integer(Integer::from(VERSION))),
            (Cbor::Text("columns".into()), Cbor::Array(columns)),
            (Cbor::Text("rows".into()), Cbor::Array(rows)),
        ]);

        let mut out = Vec::new();
        ciborium::ser::into_writer(&document, &mut out)
            .map_err(|e| CodecError::encoding(e.to_string()))?;
        Ok(out)
    }

    fn deserialize(&self, layout: &RowLayout, blob: &[u8], rows: &mut RowMap) -> CodecResult<()> {
        if blob.is_empty() {
            return Ok(());
        }

        let document = parse(blob)?;
        let positions = column_positions(layout, &document.columns);
        for cells in document.rows {
            let mut cells: Vec<Option<Cbor>> = cells.into_iter().map(Some).collect();
            let row = layout
                .columns()
                .iter()
                .zip(&positions)
                .map(|(column, pos)| {
                    match pos.and_then(|p| cells[p].take()) {
                        Some(cell) => decode_cell(cell, &column.value_type),
                        None => field::decode("", &column.value_type),
                    }
                })
                .collect::<CodecResult<Vec<_>>>()?;
            insert_row(layout, rows, row)?;
        }
        Ok(())
    }
}

fn cell_text(cell: &Cbor) -> Option<String> {
    match cell {
        Cbor::Null => None,
        Cbor::Bool(b) => Some(field::encode(&Value::Bool(*b))),
        Cbor::Integer(i) => Some(i128::from(*i).to_string()),
        Cbor::Float(f) => Some(f.to_string()),
        Cbor::Text(s) => Some(s.clone()),
        Cbor::Bytes(b) if b.len() == 16 => Uuid::from_slice(b).ok().map(|u| u.to_string()),
        Cbor::Bytes(b) => Some(
            b.iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(format!("<{}>", cbor_kind(other))),
    }
}

pub(super) fn inspect(blob: &[u8]) -> CodecResult<RawTable> {
    let document = parse(blob)?;
    let rows = document
        .rows
        .iter()
        .map(|cells| cells.iter().map(cell_text).collect())
        .collect();
    Ok(RawTable {
        columns: document.columns,
        rows,
    })
}

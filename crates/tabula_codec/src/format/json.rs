//! JSON tables: a pretty-printed array of objects.
//!
//! Each object maps column names to the field codec text of the cell, in
//! column order. Null cells are written as JSON `null`.

use super::{check_rows, insert_row, RawTable, RowFormat};
use crate::error::{CodecError, CodecResult};
use crate::field;
use crate::layout::RowLayout;
use crate::row::RowMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The JSON table format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonFormat;

/// One JSON object with its fields kept in document order.
#[derive(Debug, Default)]
struct Record(Vec<(String, Option<String>)>);

impl Record {
    fn get(&self, name: &str) -> Option<Option<&str>> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_deref())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of column names to cell text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, Cell>()? {
                    fields.push((name, value.0));
                }
                Ok(Record(fields))
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A cell as found in a file. Numbers and booleans written by hand are
/// accepted and read through their text form.
struct Cell(Option<String>);

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Cell(None)),
            serde_json::Value::String(s) => Ok(Cell(Some(s))),
            serde_json::Value::Bool(b) => Ok(Cell(Some(b.to_string()))),
            serde_json::Value::Number(n) => Ok(Cell(Some(n.to_string()))),
            other => Err(serde::de::Error::custom(format!(
                "expected a scalar cell, found {other}"
            ))),
        }
    }
}

fn parse(blob: &[u8]) -> CodecResult<Vec<Record>> {
    serde_json::from_slice(blob).map_err(|e| CodecError::decoding(e.to_string()))
}

impl RowFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, layout: &RowLayout, rows: &RowMap) -> CodecResult<Vec<u8>> {
        check_rows(layout, rows)?;

        let records: Vec<Record> = rows
            .values()
            .map(|row| {
                Record(
                    layout
                        .columns()
                        .iter()
                        .zip(row)
                        .map(|(column, value)| {
                            let text = (!value.is_null()).then(|| field::encode(value));
                            (column.name.clone(), text)
                        })
                        .collect(),
                )
            })
            .collect();

        serde_json::to_vec_pretty(&records).map_err(|e| CodecError::encoding(e.to_string()))
    }

    fn deserialize(&self, layout: &RowLayout, blob: &[u8], rows: &mut RowMap) -> CodecResult<()> {
        if blob.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        for record in parse(blob)? {
            let row = layout
                .columns()
                .iter()
                .map(|column| {
                    let text = record.get(&column.name).flatten().unwrap_or("");
                    field::decode(text, &column.value_type)
                })
                .collect::<CodecResult<Vec<_>>>()?;
            insert_row(layout, rows, row)?;
        }
        Ok(())
    }
}

pub(super) fn inspect(blob: &[u8]) -> CodecResult<RawTable> {
    let records = parse(blob)?;

    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for (name, _) in &record.0 {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|name| record.get(name).flatten().map(str::to_string))
                .collect()
        })
        .collect();
    Ok(RawTable { columns, rows })
}

//! Table serialization formats.
//!
//! A format turns a whole table (its [`RowMap`]) into one blob and back.
//! All formats share these rules:
//!
//! - an empty blob holds no rows
//! - columns are matched by name; a column missing from the blob decodes
//!   from empty text and unknown columns are ignored
//! - each parsed row is keyed through the [`RowLayout`]
//! - a key that occurs twice in one blob is a structural error

mod binary;
mod delimited;
mod json;

pub use binary::BinaryFormat;
pub use delimited::DelimitedFormat;
pub use json::JsonFormat;

use crate::error::{CodecError, CodecResult};
use crate::layout::RowLayout;
use crate::row::{Row, RowMap};
use std::collections::btree_map::Entry;
use std::fmt;
use std::str::FromStr;

/// Serializes whole tables to blobs and back.
pub trait RowFormat: Send + Sync + fmt::Debug {
    /// Returns the identifier of the format.
    fn name(&self) -> &'static str;

    /// Returns the file extension used for tables in this format.
    fn extension(&self) -> &'static str;

    /// Serializes every row of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if a row does not fit the layout.
    fn serialize(&self, layout: &RowLayout, rows: &RowMap) -> CodecResult<Vec<u8>>;

    /// Parses a blob and inserts its rows into `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is malformed, a cell cannot be decoded
    /// as its column type, or a key occurs twice.
    fn deserialize(&self, layout: &RowLayout, blob: &[u8], rows: &mut RowMap) -> CodecResult<()>;
}

/// Selects a serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FormatKind {
    /// Comma separated values.
    Csv,
    /// Tab separated values.
    Tsv,
    /// Pretty-printed JSON array of objects.
    #[default]
    Json,
    /// CBOR document.
    Cbor,
}

impl FormatKind {
    /// All available formats.
    pub const ALL: [FormatKind; 4] = [
        FormatKind::Csv,
        FormatKind::Tsv,
        FormatKind::Json,
        FormatKind::Cbor,
    ];

    /// Builds the format implementation.
    #[must_use]
    pub fn build(self) -> Box<dyn RowFormat> {
        match self {
            FormatKind::Csv => Box::new(DelimitedFormat::csv()),
            FormatKind::Tsv => Box::new(DelimitedFormat::tsv()),
            FormatKind::Json => Box::new(JsonFormat),
            FormatKind::Cbor => Box::new(BinaryFormat),
        }
    }

    /// Returns the file extension of this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            FormatKind::Csv => "csv",
            FormatKind::Tsv => "tsv",
            FormatKind::Json => "json",
            FormatKind::Cbor => "cbor",
        }
    }

    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.extension().eq_ignore_ascii_case(extension))
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FormatKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(FormatKind::Csv),
            "tsv" => Ok(FormatKind::Tsv),
            "json" => Ok(FormatKind::Json),
            "cbor" | "binary" => Ok(FormatKind::Cbor),
            _ => Err(CodecError::unknown_format(s)),
        }
    }
}

/// A table read without a schema: column names and cell text.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct RawTable {
    /// Column names in file order.
    pub columns: Vec<String>,
    /// Cell text per row, aligned with `columns`. Null cells are `None`.
    pub rows: Vec<Vec<Option<String>>>,
}

/// Reads a blob without knowing its table's layout.
///
/// # Errors
///
/// Returns an error if the blob is malformed.
pub fn inspect(kind: FormatKind, blob: &[u8]) -> CodecResult<RawTable> {
    if blob.is_empty() {
        return Ok(RawTable::default());
    }
    match kind {
        FormatKind::Csv => delimited::inspect(b',', blob),
        FormatKind::Tsv => delimited::inspect(b'\t', blob),
        FormatKind::Json => json::inspect(blob),
        FormatKind::Cbor => binary::inspect(blob),
    }
}

/// Maps each layout column to its position in a blob's column list.
fn column_positions(layout: &RowLayout, names: &[String]) -> Vec<Option<usize>> {
    layout
        .columns()
        .iter()
        .map(|c| names.iter().position(|n| *n == c.name))
        .collect()
}

/// Keys a parsed row and adds it, rejecting duplicate keys.
fn insert_row(layout: &RowLayout, rows: &mut RowMap, row: Row) -> CodecResult<()> {
    let key = layout.key_of(&row)?;
    match rows.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(row);
            Ok(())
        }
        Entry::Occupied(slot) => Err(CodecError::invalid_structure(format!(
            "duplicate key {}",
            slot.key()
        ))),
    }
}

/// Checks that every row fits the layout before writing.
fn check_rows(layout: &RowLayout, rows: &RowMap) -> CodecResult<()> {
    match rows.values().find(|row| row.len() != layout.len()) {
        Some(row) => Err(CodecError::encoding(format!(
            "row has {} values, layout has {} columns",
            row.len(),
            layout.len()
        ))),
        None => Ok(()),
    }
}

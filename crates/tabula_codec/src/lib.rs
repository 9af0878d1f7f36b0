//! # Tabula Codec
//!
//! Values, rows and the serialization formats of Tabula tables.
//!
//! - [`Value`] and [`ValueType`] describe cells and declared column types
//! - [`field`] converts single values to and from text
//! - [`Row`], [`Key`] and [`RowMap`] hold the rows of a table
//! - [`RowLayout`] describes a table's columns and key
//! - [`RowFormat`] implementations turn a whole table into a blob and back
//!
//! ## Usage
//!
//! ```
//! use tabula_codec::{Column, FormatKind, Key, RowLayout, RowMap, Value, ValueType};
//!
//! let layout = RowLayout::new(
//!     vec![Column::new("Id", ValueType::Int32), Column::new("Name", ValueType::Text)],
//!     vec![0],
//! )
//! .unwrap();
//!
//! let mut rows = RowMap::new();
//! rows.insert(Key::single(1), vec![Value::Int32(1), Value::from("a")]);
//!
//! let format = FormatKind::Csv.build();
//! let blob = format.serialize(&layout, &rows).unwrap();
//! assert_eq!(blob, b"Id,Name\r\n1,a\r\n");
//!
//! let mut back = RowMap::new();
//! format.deserialize(&layout, &blob, &mut back).unwrap();
//! assert_eq!(back, rows);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod field;
mod format;
mod layout;
mod row;
mod value;

pub use error::{CodecError, CodecResult};
pub use format::{
    inspect, BinaryFormat, DelimitedFormat, FormatKind, JsonFormat, RawTable, RowFormat,
};
pub use layout::{Column, RowLayout};
pub use row::{Key, Row, RowMap};
pub use value::{EnumType, Value, ValueType};

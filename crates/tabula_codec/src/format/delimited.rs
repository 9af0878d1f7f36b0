//! Delimited text tables (CSV and TSV).
//!
//! The first record holds the column names. Fields containing the
//! delimiter, a quote or a line break are wrapped in double quotes with
//! inner quotes doubled. Records end with CRLF; LF alone is accepted on
//! read.

use super::{check_rows, column_positions, insert_row, RawTable, RowFormat};
use crate::error::{CodecError, CodecResult};
use crate::field;
use crate::layout::RowLayout;
use crate::row::RowMap;

const QUOTE: char = '"';
const BOM: char = '\u{feff}';

/// A delimiter-separated text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedFormat {
    delimiter: u8,
}

impl DelimitedFormat {
    /// Comma separated values.
    #[must_use]
    pub const fn csv() -> Self {
        Self { delimiter: b',' }
    }

    /// Tab separated values.
    #[must_use]
    pub const fn tsv() -> Self {
        Self { delimiter: b'\t' }
    }

    fn delimiter(&self) -> char {
        char::from(self.delimiter)
    }

    fn write_record<'a>(&self, out: &mut String, fields: impl Iterator<Item = &'a str>) {
        let delimiter = self.delimiter();
        let fields: Vec<&str> = fields.collect();
        for (i, text) in fields.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            // a lone empty field would otherwise read back as a blank line
            let lone_empty = fields.len() == 1 && text.is_empty();
            if lone_empty || text.contains([delimiter, QUOTE, '\r', '\n']) {
                out.push(QUOTE);
                for c in text.chars() {
                    if c == QUOTE {
                        out.push(QUOTE);
                    }
                    out.push(c);
                }
                out.push(QUOTE);
            } else {
                out.push_str(text);
            }
        }
        out.push_str("\r\n");
    }
}

impl RowFormat for DelimitedFormat {
    fn name(&self) -> &'static str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }

    fn extension(&self) -> &'static str {
        self.name()
    }

    fn serialize(&self, layout: &RowLayout, rows: &RowMap) -> CodecResult<Vec<u8>> {
        check_rows(layout, rows)?;

        let mut out = String::new();
        self.write_record(&mut out, layout.columns().iter().map(|c| c.name.as_str()));
        for row in rows.values() {
            let cells: Vec<String> = row.iter().map(field::encode).collect();
            self.write_record(&mut out, cells.iter().map(String::as_str));
        }
        Ok(out.into_bytes())
    }

    fn deserialize(&self, layout: &RowLayout, blob: &[u8], rows: &mut RowMap) -> CodecResult<()> {
        let mut records = parse_records(blob, self.delimiter())?.into_iter();
        let Some(header) = records.next() else {
            return Ok(());
        };
        let positions = column_positions(layout, &header);

        for (line, record) in records.enumerate() {
            if record.len() != header.len() {
                return Err(CodecError::invalid_structure(format!(
                    "record {} has {} fields, header has {}",
                    line + 1,
                    record.len(),
                    header.len()
                )));
            }
            let row = layout
                .columns()
                .iter()
                .zip(&positions)
                .map(|(column, pos)| {
                    let text = pos.map_or("", |p| record[p].as_str());
                    field::decode(text, &column.value_type)
                })
                .collect::<CodecResult<Vec<_>>>()?;
            insert_row(layout, rows, row)?;
        }
        Ok(())
    }
}

pub(super) fn inspect(delimiter: u8, blob: &[u8]) -> CodecResult<RawTable> {
    let mut records = parse_records(blob, char::from(delimiter))?.into_iter();
    let columns = records.next().unwrap_or_default();
    let rows = records
        .map(|record| record.into_iter().map(Some).collect())
        .collect();
    Ok(RawTable { columns, rows })
}

fn parse_records(blob: &[u8], delimiter: char) -> CodecResult<Vec<Vec<String>>> {
    let text = std::str::from_utf8(blob).map_err(|e| CodecError::decoding(e.to_string()))?;
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line_started = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    field.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            QUOTE if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
                line_started = true;
            }
            c if c == delimiter => {
                record.push(std::mem::take(&mut field));
                quoted = false;
                line_started = true;
            }
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if line_started {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                quoted = false;
                line_started = false;
            }
            _ => {
                field.push(c);
                line_started = true;
            }
        }
    }

    if in_quotes {
        return Err(CodecError::decoding("unterminated quoted field"));
    }
    if line_started {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Column;
    use crate::row::Key;
    use crate::value::{Value, ValueType};

    fn layout() -> RowLayout {
        RowLayout::new(
            vec![
                Column::new("Id", ValueType::Int32),
                Column::new("Name", ValueType::Text),
            ],
            vec![0],
        )
        .unwrap()
    }

    #[test]
    fn writes_header_and_quotes() {
        let mut rows = RowMap::new();
        rows.insert(
            Key::single(1),
            vec![Value::Int32(1), Value::from("say \"hi\", ok")],
        );
        let blob = DelimitedFormat::csv().serialize(&layout(), &rows).unwrap();
        assert_eq!(
            String::from_utf8(blob).unwrap(),
            "Id,Name\r\n1,\"say \"\"hi\"\", ok\"\r\n"
        );
    }

    #[test]
    fn tsv_leaves_commas_alone() {
        let mut rows = RowMap::new();
        rows.insert(Key::single(1), vec![Value::Int32(1), Value::from("a,b")]);
        let blob = DelimitedFormat::tsv().serialize(&layout(), &rows).unwrap();
        assert_eq!(String::from_utf8(blob).unwrap(), "Id\tName\r\n1\ta,b\r\n");
    }

    #[test]
    fn reads_lf_endings_bom_and_reordered_columns() {
        let blob = "\u{feff}Name,Extra,Id\nAlice,x,1\nBob,y,2\n";
        let mut rows = RowMap::new();
        DelimitedFormat::csv()
            .deserialize(&layout(), blob.as_bytes(), &mut rows)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[&Key::single(2)], vec![Value::Int32(2), Value::from("Bob")]);
    }

    #[test]
    fn rejects_ragged_records() {
        let mut rows = RowMap::new();
        let err = DelimitedFormat::csv()
            .deserialize(&layout(), b"Id,Name\r\n1\r\n", &mut rows)
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidStructure { .. }));
    }

    #[test]
    fn rejects_unterminated_quote() {
        let mut rows = RowMap::new();
        let err = DelimitedFormat::csv()
            .deserialize(&layout(), b"Id,Name\r\n1,\"open\r\n", &mut rows)
            .unwrap_err();
        assert!(matches!(err, CodecError::Decoding { .. }));
    }

    #[test]
    fn bad_cell_is_a_format_error() {
        let mut rows = RowMap::new();
        let err = DelimitedFormat::csv()
            .deserialize(&layout(), b"Id,Name\r\nx,a\r\n", &mut rows)
            .unwrap_err();
        assert!(matches!(err, CodecError::Format { .. }));
    }

    #[test]
    fn single_empty_column_survives() {
        let single =
            RowLayout::new(vec![Column::new("Name", ValueType::Text)], vec![0]).unwrap();
        let mut rows = RowMap::new();
        rows.insert(Key::single(""), vec![Value::from("")]);
        let format = DelimitedFormat::csv();
        let blob = format.serialize(&single, &rows).unwrap();
        let mut back = RowMap::new();
        format.deserialize(&single, &blob, &mut back).unwrap();
        assert_eq!(back, rows);
    }
}

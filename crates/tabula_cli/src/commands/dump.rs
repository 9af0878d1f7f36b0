//! Dump command implementation.

use super::resolve_format;
use std::path::Path;
use tabula_codec::RawTable;
use tabula_storage::{DefaultFileManager, FileManager};

/// Runs the dump command.
pub fn run(file: &Path, format: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let kind = resolve_format(file, format)?;
    let manager = DefaultFileManager::new(file);
    if !manager.exists()? {
        return Err(format!("No table file at {}", file.display()).into());
    }

    let table = tabula_codec::inspect(kind, &manager.read()?)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        print!("{}", render(&table));
    }
    Ok(())
}

/// Renders a table as aligned text columns. Nulls print as `NULL`.
fn render(table: &RawTable) -> String {
    let cells: Vec<Vec<&str>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.as_deref().unwrap_or("NULL")).collect())
        .collect();

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: &[&str]| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    let mut out = String::new();
    out.push_str(&line(&header));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &cells {
        out.push_str(&line(row));
        out.push('\n');
    }
    out.push_str(&format!("({} rows)\n", cells.len()));
    out
}

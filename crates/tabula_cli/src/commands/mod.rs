//! CLI command implementations.

pub mod clear;
pub mod dump;
pub mod inspect;

use std::path::Path;
use tabula_codec::FormatKind;

/// Picks the format named on the command line, or the one matching the
/// file extension.
pub fn resolve_format(file: &Path, explicit: Option<&str>) -> Result<FormatKind, Box<dyn std::error::Error>> {
    if let Some(name) = explicit {
        return Ok(name.parse()?);
    }
    file.extension()
        .and_then(|e| e.to_str())
        .and_then(FormatKind::from_extension)
        .ok_or_else(|| format!("cannot tell the format of {}, pass --format", file.display()).into())
}

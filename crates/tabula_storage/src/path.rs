//! Table file location.

use std::path::{Path, PathBuf};

/// Characters that are not allowed in a table file name.
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Resolves the file of one table.
///
/// The layout is `<root>/<namespace>/<sanitized table name>.<extension>`.
/// An empty namespace places the file directly under `root`.
///
/// # Example
///
/// ```
/// use tabula_storage::table_file_path;
/// use std::path::Path;
///
/// let path = table_file_path(Path::new("data"), "shop", "Order/Line", "csv");
/// assert_eq!(path, Path::new("data").join("shop").join("Order_Line.csv"));
/// ```
#[must_use]
pub fn table_file_path(root: &Path, namespace: &str, table_name: &str, extension: &str) -> PathBuf {
    let dir = if namespace.is_empty() {
        root.to_path_buf()
    } else {
        root.join(sanitize_file_name(namespace))
    };
    dir.join(format!("{}.{extension}", sanitize_file_name(table_name)))
}

/// Replaces characters that cannot appear in a file name with `_`.
///
/// Control characters are replaced as well. An empty name becomes `_`.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

//! Clear command implementation.

use std::path::Path;
use tabula_storage::{DefaultFileManager, FileManager};
use tracing::info;

/// Runs the clear command.
pub fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if clear(file)? {
        info!(path = %file.display(), "table file deleted");
        println!("Deleted {}", file.display());
    } else {
        println!("No table file at {}", file.display());
    }
    Ok(())
}

fn clear(file: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    Ok(DefaultFileManager::new(file).clear()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn deletes_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Blog.csv");
        fs::write(&file, "Id\r\n1\r\n").unwrap();

        assert!(clear(&file).unwrap());
        assert!(!file.exists());
        assert!(!clear(&file).unwrap());
    }
}

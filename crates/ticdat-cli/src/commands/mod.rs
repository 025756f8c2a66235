//! CLI command implementations.

pub mod check;
pub mod convert;
pub mod describe;

use std::path::Path;

use ticdat::{CsvDirectory, JsonFile, TableSource};

/// Open a data set: a directory is read as CSV files, a `.json` file as JSON.
pub(crate) fn open_data(
    path: &Path,
    delimiter: Option<char>,
) -> Result<Box<dyn TableSource>, Box<dyn std::error::Error>> {
    if path.is_dir() {
        let mut dir = CsvDirectory::new(path)?;
        if let Some(d) = delimiter {
            if !d.is_ascii() {
                return Err(format!("Delimiter must be a single ASCII character, got '{}'", d).into());
            }
            dir = dir.with_delimiter(d as u8);
        }
        return Ok(Box::new(dir));
    }

    if is_json_path(path) {
        if !path.exists() {
            return Err(format!("Data file not found: {}", path.display()).into());
        }
        return Ok(Box::new(JsonFile::open(path)?));
    }

    Err(format!(
        "Cannot read {}: expected a directory of CSV files or a .json file",
        path.display()
    )
    .into())
}

pub(crate) fn is_json_path(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_data_by_shape() {
        let dir = TempDir::new().unwrap();
        assert!(open_data(dir.path(), None).is_ok());
        assert!(open_data(dir.path(), Some('\u{e9}')).is_err());

        let json = dir.path().join("data.json");
        std::fs::write(&json, "{}").unwrap();
        assert!(open_data(&json, None).is_ok());

        let other = dir.path().join("data.xlsx");
        std::fs::write(&other, "").unwrap();
        assert!(open_data(&other, None).is_err());
        assert!(open_data(&dir.path().join("missing.json"), None).is_err());
    }
}

//! Directory of delimited files, one `<table>.csv` per table.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::source::{RawTable, SourceMetadata, TableSource};
use crate::dat::{Table, TicDat};
use crate::error::{Result, TicDatError};
use crate::normalize::Normalizer;
use crate::schema::Schema;
use crate::value::Value;

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Reads tables from a directory of delimited text files.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
    delimiter: Option<u8>,
}

impl CsvDirectory {
    /// Open a directory. The delimiter is detected per file.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TicDatError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            delimiter: None,
        })
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Path of the file holding `table`, matched case-insensitively.
    fn find_file(&self, table: &str) -> Result<Option<PathBuf>> {
        let wanted = format!("{}.csv", table);
        let entries = fs::read_dir(&self.dir).map_err(|e| TicDatError::io(&self.dir, e))?;
        let mut fallback = None;
        for entry in entries {
            let entry = entry.map_err(|e| TicDatError::io(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == wanted {
                return Ok(Some(entry.path()));
            }
            if fallback.is_none() && name.eq_ignore_ascii_case(&wanted) {
                fallback = Some(entry.path());
            }
        }
        Ok(fallback)
    }
}

impl TableSource for CsvDirectory {
    fn raw_table(&self, table: &str) -> Result<Option<RawTable>> {
        let Some(path) = self.find_file(table)? else {
            debug!(table, dir = %self.dir.display(), "no file for table");
            return Ok(None);
        };
        let contents = fs::read(&path).map_err(|e| TicDatError::io(&path, e))?;
        let delimiter = match self.delimiter {
            Some(d) => d,
            None => detect_delimiter(&contents),
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(contents.as_slice());
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(TicDatError::construction(table, "file has no header row"));
        }

        let width = headers.len();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Value> = record.iter().map(Value::from).collect();
            // Pad short rows; drop cells beyond the header.
            row.resize(width, Value::Text(String::new()));
            rows.push(row);
        }

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        };
        let metadata = SourceMetadata::new(path.clone(), &contents, format, rows.len());
        debug!(table, path = %path.display(), rows = rows.len(), "read delimited file");
        Ok(Some(RawTable::headed(headers, rows).textual().with_source(metadata)))
    }
}

/// Write every table of `dat` as `<table>.csv` under `dir`.
///
/// Cells hold the normalized write value; null becomes an empty cell.
pub fn write_directory(
    schema: &Schema,
    dat: &TicDat,
    dir: impl AsRef<Path>,
    allow_overwrite: bool,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|e| TicDatError::io(dir, e))?;
    let normalizer = Normalizer::new(schema);

    for spec in schema.tables() {
        let path = dir.join(format!("{}.csv", spec.name));
        if path.exists() && !allow_overwrite {
            return Err(TicDatError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists"),
            ));
        }
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(spec.all_fields())?;

        let Some(table) = dat.table(&spec.name) else {
            writer.flush().map_err(|e| TicDatError::io(&path, e))?;
            continue;
        };
        let mut written = 0;
        match table {
            Table::Keyed(rows) => {
                for (key, row) in rows {
                    let cells = key
                        .values()
                        .iter()
                        .chain(spec.data.iter().map(|f| row.get(f).unwrap_or(&Value::Null)))
                        .map(|v| render_cell(&normalizer.write_cell(v)));
                    writer.write_record(cells.collect::<Vec<_>>())?;
                    written += 1;
                }
            }
            Table::AppendOnly(rows) => {
                for row in rows {
                    let cells = spec
                        .data
                        .iter()
                        .map(|f| render_cell(&normalizer.write_cell(row.get(f).unwrap_or(&Value::Null))));
                    writer.write_record(cells.collect::<Vec<_>>())?;
                    written += 1;
                }
            }
        }
        writer.flush().map_err(|e| TicDatError::io(&path, e))?;
        debug!(table = %spec.name, rows = written, "wrote delimited file");
    }
    info!(dir = %dir.display(), tables = schema.tables().count(), "wrote csv directory");
    Ok(())
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let lines: Vec<String> = BufReader::new(bytes)
        .lines()
        .take(10)
        .map_while(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut best_delimiter = b',';
    let mut best_score = 0;
    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();
        let Some(&first_count) = counts.first() else {
            continue;
        };
        if first_count == 0 {
            continue;
        }
        // Consistent counts across lines beat a higher but ragged count.
        let score = if counts.iter().all(|&c| c == first_count) {
            first_count * 1000 + usize::from(delim == b'\t') * 100
        } else {
            first_count
        };
        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }
    best_delimiter
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delim_char && !in_quotes {
            count += 1;
        }
    }
    count
}

//! Raw table records and the source abstraction adapters implement.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::value::Value;

/// Metadata about a file an adapter read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Format name (csv, tsv, json, ...).
    pub format: String,
    /// Number of data rows read.
    pub row_count: usize,
    /// When the file was read.
    pub read_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Metadata for file `contents` read from `path`.
    pub fn new(path: PathBuf, contents: &[u8], format: impl Into<String>, row_count: usize) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            file,
            path,
            hash: content_hash(contents),
            size_bytes: contents.len() as u64,
            format: format.into(),
            row_count,
            read_at: Utc::now(),
        }
    }
}

/// `sha256:<hex>` digest of a byte slice.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("sha256:{:x}", hasher.finalize())
}

/// The rows of one raw table in whichever shape the adapter produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRows {
    /// Cells in declared field order: primary-key fields, then data fields.
    Positional(Vec<Vec<Value>>),
    /// A header row naming the columns, followed by positional cells.
    Headed {
        headers: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// One field-name to value mapping per row.
    Named(Vec<IndexMap<String, Value>>),
}

/// Unnormalized rows for one table, as handed to the builder.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub rows: RawRows,
    /// Cells came from a text-only format.
    pub textual: bool,
    pub source: Option<SourceMetadata>,
}

impl RawTable {
    pub fn positional<R, V>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        Self::from_rows(RawRows::Positional(rows))
    }

    pub fn headed<H, R, V>(headers: impl IntoIterator<Item = H>, rows: impl IntoIterator<Item = R>) -> Self
    where
        H: Into<String>,
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let headers = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(Into::into).collect())
            .collect();
        Self::from_rows(RawRows::Headed { headers, rows })
    }

    pub fn from_records(records: Vec<IndexMap<String, Value>>) -> Self {
        Self::from_rows(RawRows::Named(records))
    }

    fn from_rows(rows: RawRows) -> Self {
        Self {
            rows,
            textual: false,
            source: None,
        }
    }

    /// Mark the cells as coming from a text-only format.
    pub fn textual(mut self) -> Self {
        self.textual = true;
        self
    }

    pub fn with_source(mut self, source: SourceMetadata) -> Self {
        self.source = Some(source);
        self
    }

    pub fn row_count(&self) -> usize {
        match &self.rows {
            RawRows::Positional(rows) => rows.len(),
            RawRows::Headed { rows, .. } => rows.len(),
            RawRows::Named(rows) => rows.len(),
        }
    }
}

/// Anything that can hand over raw rows per table.
///
/// `Ok(None)` means the table is absent from the source, which the builder
/// treats as an empty table.
pub trait TableSource {
    fn raw_table(&self, table: &str) -> Result<Option<RawTable>>;
}

/// Raw tables held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: IndexMap<String, RawTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: RawTable) -> Self {
        self.insert(name, table);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        self.tables.insert(name.into(), table);
    }
}

impl TableSource for MemorySource {
    fn raw_table(&self, table: &str) -> Result<Option<RawTable>> {
        Ok(self.tables.get(table).cloned())
    }
}

//! A single JSON document holding every table: `{"table": [rows]}`.
//!
//! Rows are either arrays in declared field order or objects keyed by field
//! name. Both shapes may not be mixed within one table.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};

use super::source::{RawTable, SourceMetadata, TableSource};
use crate::dat::{RowRef, TicDat};
use crate::error::{Result, TicDatError};
use crate::normalize::Normalizer;
use crate::schema::Schema;
use crate::value::Value;

/// Tables parsed from a JSON document.
#[derive(Debug, Clone)]
pub struct JsonFile {
    tables: Map<String, JsonValue>,
    metadata: Option<SourceMetadata>,
}

impl JsonFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|e| TicDatError::io(path, e))?;
        let mut file = Self::from_slice(&contents)?;
        let rows = file
            .tables
            .values()
            .filter_map(JsonValue::as_array)
            .map(Vec::len)
            .sum();
        file.metadata = Some(SourceMetadata::new(path.to_path_buf(), &contents, "json", rows));
        Ok(file)
    }

    pub fn parse(json: &str) -> Result<Self> {
        Self::from_slice(json.as_bytes())
    }

    fn from_slice(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice(bytes)? {
            JsonValue::Object(tables) => Ok(Self {
                tables,
                metadata: None,
            }),
            _ => Err(TicDatError::construction(
                "*",
                "a JSON data file must be an object mapping table names to rows",
            )),
        }
    }

    fn lookup(&self, table: &str) -> Option<&JsonValue> {
        self.tables.get(table).or_else(|| {
            self.tables
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(table))
                .map(|(_, v)| v)
        })
    }
}

impl TableSource for JsonFile {
    fn raw_table(&self, table: &str) -> Result<Option<RawTable>> {
        let Some(entry) = self.lookup(table) else {
            debug!(table, "table absent from json document");
            return Ok(None);
        };
        let rows = entry
            .as_array()
            .ok_or_else(|| TicDatError::construction(table, "rows must be a JSON array"))?;

        let raw = if rows.iter().all(JsonValue::is_object) && !rows.is_empty() {
            let mut records = Vec::with_capacity(rows.len());
            for row in rows.iter().filter_map(JsonValue::as_object) {
                let mut record = IndexMap::with_capacity(row.len());
                for (field, cell) in row {
                    record.insert(field.clone(), scalar(table, cell)?);
                }
                records.push(record);
            }
            RawTable::from_records(records)
        } else {
            let mut positional = Vec::with_capacity(rows.len());
            for row in rows {
                let cells = row.as_array().ok_or_else(|| {
                    TicDatError::construction(table, "rows must all be arrays or all be objects")
                })?;
                positional.push(
                    cells
                        .iter()
                        .map(|c| scalar(table, c))
                        .collect::<Result<Vec<_>>>()?,
                );
            }
            RawTable::positional(positional)
        };

        Ok(Some(match &self.metadata {
            Some(metadata) => raw.with_source(metadata.clone()),
            None => raw,
        }))
    }
}

fn scalar(table: &str, cell: &JsonValue) -> Result<Value> {
    Value::from_json(cell).ok_or_else(|| {
        TicDatError::construction(table, format!("cell {} is not a scalar", cell))
    })
}

/// Serialize `dat` as a JSON document of named records.
pub fn to_json_value(schema: &Schema, dat: &TicDat) -> JsonValue {
    let normalizer = Normalizer::new(schema);
    let mut document = Map::new();
    for spec in schema.tables() {
        let mut rows = Vec::new();
        if let Some(table) = dat.table(&spec.name) {
            for (row_ref, row) in table.rows() {
                let mut record = Map::new();
                if let RowRef::Key(key) = &row_ref {
                    for (field, value) in spec.primary_key.iter().zip(key.values()) {
                        record.insert(field.clone(), normalizer.write_cell(value).to_json());
                    }
                }
                for field in &spec.data {
                    let value = row.get(field).unwrap_or(&Value::Null);
                    record.insert(field.clone(), normalizer.write_cell(value).to_json());
                }
                rows.push(JsonValue::Object(record));
            }
        }
        document.insert(spec.name.clone(), JsonValue::Array(rows));
    }
    JsonValue::Object(document)
}

/// Write `dat` to `path` as pretty-printed JSON.
pub fn write_json_file(
    schema: &Schema,
    dat: &TicDat,
    path: impl AsRef<Path>,
    allow_overwrite: bool,
) -> Result<()> {
    let path: PathBuf = path.as_ref().to_path_buf();
    if path.exists() && !allow_overwrite {
        return Err(TicDatError::io(
            &path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "file exists"),
        ));
    }
    let document = to_json_value(schema, dat);
    let text = serde_json::to_string_pretty(&document)?;
    fs::write(&path, text).map_err(|e| TicDatError::io(&path, e))?;
    info!(path = %path.display(), "wrote json file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::RawRows;

    #[test]
    fn test_positional_and_named_rows() {
        let file = JsonFile::parse(
            r#"{"Foods": [["milk", 0.89]], "nutrition": [{"Food": "milk", "Quantity": 2}]}"#,
        )
        .unwrap();
        let foods = file.raw_table("foods").unwrap().unwrap();
        assert!(matches!(foods.rows, RawRows::Positional(ref rows) if rows[0].len() == 2));
        let nutrition = file.raw_table("nutrition").unwrap().unwrap();
        assert!(matches!(nutrition.rows, RawRows::Named(_)));
        assert!(file.raw_table("categories").unwrap().is_none());
    }

    #[test]
    fn test_rejects_mixed_and_nested_rows() {
        let file = JsonFile::parse(r#"{"a": [["x"], {"f": 1}], "b": [[[1]]]}"#).unwrap();
        assert!(file.raw_table("a").is_err());
        assert!(file.raw_table("b").is_err());
        assert!(JsonFile::parse("[1, 2]").is_err());
    }
}

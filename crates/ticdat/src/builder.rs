//! Assembles raw rows into table collections.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::dat::{Row, Table, TicDat};
use crate::error::{Result, TicDatError};
use crate::input::{RawRows, RawTable, SourceMetadata, TableSource};
use crate::integrity::DuplicateReport;
use crate::normalize::{Normalizer, ReadOptions};
use crate::schema::{Schema, TableSpec};
use crate::value::{Key, Value};

/// Everything learned from one pass over a source.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub dat: TicDat,
    /// Files read, per table.
    pub sources: IndexMap<String, SourceMetadata>,
    pub duplicates: DuplicateReport,
}

/// Builds [`TicDat`] collections for one schema.
#[derive(Debug, Clone, Copy)]
pub struct Builder<'a> {
    schema: &'a Schema,
    options: ReadOptions,
}

impl<'a> Builder<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            options: ReadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a collection. Tables the source lacks are empty.
    ///
    /// A repeated primary key keeps its last occurrence; use
    /// [`Builder::find_duplicates`] to detect repeats.
    pub fn build(&self, source: &dyn TableSource) -> Result<TicDat> {
        Ok(self.build_report(source)?.dat)
    }

    /// Build and freeze.
    pub fn build_frozen(&self, source: &dyn TableSource) -> Result<TicDat> {
        Ok(self.build(source)?.freeze())
    }

    /// Primary keys the source repeats, with their occurrence counts.
    pub fn find_duplicates(&self, source: &dyn TableSource) -> Result<DuplicateReport> {
        Ok(self.build_report(source)?.duplicates)
    }

    /// Build, recording source metadata and duplicate counts on the way.
    pub fn build_report(&self, source: &dyn TableSource) -> Result<BuildOutcome> {
        let mut tables = IndexMap::new();
        let mut sources = IndexMap::new();
        let mut duplicates = DuplicateReport::new();

        for spec in self.schema.tables() {
            let Some(raw) = source.raw_table(&spec.name)? else {
                debug!(table = %spec.name, "table not in source, leaving it empty");
                tables.insert(spec.name.clone(), empty_table(spec));
                continue;
            };
            let (table, counts) = self.assemble(spec, &raw)?;
            debug!(table = %spec.name, rows = table.len(), raw_rows = raw.row_count(), "built table");
            duplicates.record(&spec.name, counts);
            if let Some(metadata) = raw.source {
                sources.insert(spec.name.clone(), metadata);
            }
            tables.insert(spec.name.clone(), table);
        }

        info!(
            tables = tables.len(),
            rows = tables.values().map(Table::len).sum::<usize>(),
            "built table collection"
        );
        Ok(BuildOutcome {
            dat: TicDat::from_tables(tables),
            sources,
            duplicates,
        })
    }

    /// Build a single table from raw rows.
    pub fn build_table(&self, table: &str, raw: &RawTable) -> Result<Table> {
        let spec = self.schema.table_spec(table)?;
        Ok(self.assemble(spec, raw)?.0)
    }

    fn assemble(&self, spec: &TableSpec, raw: &RawTable) -> Result<(Table, IndexMap<Key, usize>)> {
        let records = resolve_records(spec, raw)?;
        let normalizer = Normalizer::with_options(self.schema, self.options);
        let pk_len = spec.primary_key.len();

        // Defaults are looked up once per table, and only when needed.
        let mut defaults: IndexMap<&str, Value> = IndexMap::new();
        let mut counts: IndexMap<Key, usize> = IndexMap::new();
        let mut keyed: IndexMap<Key, Row> = IndexMap::new();
        let mut append_only: Vec<Row> = Vec::new();

        for record in records {
            let mut cells = Vec::with_capacity(record.len());
            for (field, cell) in spec.all_fields().zip(record) {
                let value = match cell {
                    Some(raw_value) => normalizer.read_cell(&spec.name, field, raw_value, raw.textual),
                    None => match defaults.get(field) {
                        Some(default) => default.clone(),
                        None => {
                            let default = self.schema.default_value(&spec.name, field)?;
                            defaults.insert(field, default.clone());
                            default
                        }
                    },
                };
                cells.push(value);
            }

            let data_cells = cells.split_off(pk_len);
            let row: Row = spec.data.iter().cloned().zip(data_cells).collect();
            if spec.is_keyed() {
                let key = Key::new(cells);
                *counts.entry(key.clone()).or_insert(0) += 1;
                keyed.insert(key, row);
            } else {
                append_only.push(row);
            }
        }

        let table = if spec.is_keyed() {
            Table::Keyed(keyed)
        } else {
            Table::AppendOnly(append_only)
        };
        Ok((table, counts))
    }
}

fn empty_table(spec: &TableSpec) -> Table {
    if spec.is_keyed() {
        Table::Keyed(IndexMap::new())
    } else {
        Table::AppendOnly(Vec::new())
    }
}

/// Cells in declared field order. `None` marks an omitted data field.
fn resolve_records(spec: &TableSpec, raw: &RawTable) -> Result<Vec<Vec<Option<Value>>>> {
    let width = spec.field_count();
    match &raw.rows {
        RawRows::Positional(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != width {
                    return Err(TicDatError::construction(
                        &spec.name,
                        format!("row {} has {} cells, expected {}", i, row.len(), width),
                    ));
                }
                Ok(row.iter().cloned().map(Some).collect::<Vec<_>>())
            })
            .collect(),
        RawRows::Headed { headers, rows } => {
            let columns = resolve_columns(spec, headers)?;
            rows.iter()
                .enumerate()
                .map(|(i, row)| {
                    columns
                        .iter()
                        .map(|&c| {
                            row.get(c).cloned().map(Some).ok_or_else(|| {
                                TicDatError::construction(
                                    &spec.name,
                                    format!("row {} has {} cells, expected at least {}", i, row.len(), c + 1),
                                )
                            })
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .collect()
        }
        RawRows::Named(records) => records
            .iter()
            .enumerate()
            .map(|(i, record)| resolve_named(spec, i, record))
            .collect(),
    }
}

/// Column index of each declared field: exact name first, then
/// case-insensitive. Extra columns are ignored.
fn resolve_columns(spec: &TableSpec, headers: &[String]) -> Result<Vec<usize>> {
    spec.all_fields()
        .map(|field| {
            if let Some(i) = headers.iter().position(|h| h == field) {
                return Ok(i);
            }
            let matches: Vec<usize> = headers
                .iter()
                .enumerate()
                .filter(|(_, h)| h.eq_ignore_ascii_case(field))
                .map(|(i, _)| i)
                .collect();
            match matches.as_slice() {
                [i] => Ok(*i),
                [] => Err(TicDatError::construction(
                    &spec.name,
                    format!("field '{}' has no column", field),
                )),
                _ => Err(TicDatError::construction(
                    &spec.name,
                    format!("field '{}' matches {} columns", field, matches.len()),
                )),
            }
        })
        .collect()
}

fn resolve_named(
    spec: &TableSpec,
    index: usize,
    record: &IndexMap<String, Value>,
) -> Result<Vec<Option<Value>>> {
    let mut cells: Vec<Option<Value>> = vec![None; spec.field_count()];
    for (name, value) in record {
        let position = spec
            .all_fields()
            .position(|f| f == name)
            .or_else(|| spec.all_fields().position(|f| f.eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                TicDatError::construction(
                    &spec.name,
                    format!("row {} names unknown field '{}'", index, name),
                )
            })?;
        if cells[position].is_some() {
            return Err(TicDatError::construction(
                &spec.name,
                format!("row {} gives field '{}' more than once", index, name),
            ));
        }
        cells[position] = Some(value.clone());
    }
    if let Some(missing) = spec
        .primary_key
        .iter()
        .zip(&cells)
        .find_map(|(f, c)| c.is_none().then_some(f))
    {
        return Err(TicDatError::construction(
            &spec.name,
            format!("row {} is missing primary key field '{}'", index, missing),
        ));
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MemorySource;
    use crate::schema::DataType;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_table("foods", ["Name"], ["Cost", "Kind"]).unwrap();
        schema.add_table("log", Vec::<String>::new(), ["Message"]).unwrap();
        schema.set_default_value("foods", "Kind", "plain").unwrap();
        schema
    }

    fn record(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs.iter().map(|(f, v)| (f.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_last_write_wins() {
        let schema = schema();
        let source = MemorySource::new().with_table(
            "foods",
            RawTable::positional([
                vec![Value::from("milk"), Value::from(1.0), Value::from("a")],
                vec![Value::from("milk"), Value::from(2.0), Value::from("b")],
            ]),
        );
        let builder = Builder::new(&schema);
        let dat = builder.build(&source).unwrap();
        assert_eq!(dat.get("foods", "milk").unwrap()["Cost"], Value::Float(2.0));
        let duplicates = builder.find_duplicates(&source).unwrap();
        assert_eq!(duplicates.count("foods", "milk"), Some(2));
        assert!(dat.table("log").unwrap().is_empty());
    }

    #[test]
    fn test_headed_columns_case_insensitive() {
        let schema = schema();
        let raw = RawTable::headed(
            ["name", "COST", "kind", "extra"],
            [vec!["milk", "0.89", "x", "ignored"]],
        )
        .textual();
        let table = Builder::new(&schema).build_table("foods", &raw).unwrap();
        let row = &table.keyed().unwrap()[&Key::from("milk")];
        assert_eq!(row["Cost"], Value::Float(0.89));
    }

    #[test]
    fn test_headed_ambiguous_and_missing_columns() {
        let schema = schema();
        let ambiguous = RawTable::headed(["name", "NAME", "Cost", "Kind"], [vec!["a", "b", "1", "k"]]);
        assert!(matches!(
            Builder::new(&schema).build_table("foods", &ambiguous),
            Err(TicDatError::Construction { .. })
        ));
        let missing = RawTable::headed(["Name", "Cost"], [vec!["a", "1"]]);
        assert!(Builder::new(&schema).build_table("foods", &missing).is_err());
    }

    #[test]
    fn test_named_records_take_defaults() {
        let schema = schema();
        let raw = RawTable::from_records(vec![record(&[
            ("name", Value::from("milk")),
            ("Cost", Value::from(1)),
        ])]);
        let table = Builder::new(&schema).build_table("foods", &raw).unwrap();
        let row = &table.keyed().unwrap()[&Key::from("milk")];
        assert_eq!(row["Kind"], Value::from("plain"));

        let unknown = RawTable::from_records(vec![record(&[
            ("Name", Value::from("milk")),
            ("Price", Value::from(1)),
        ])]);
        assert!(Builder::new(&schema).build_table("foods", &unknown).is_err());
        let keyless = RawTable::from_records(vec![record(&[("Cost", Value::from(1))])]);
        assert!(Builder::new(&schema).build_table("foods", &keyless).is_err());
    }

    #[test]
    fn test_bad_default_fails_construction() {
        let mut schema = schema();
        schema
            .set_data_type("foods", "Kind", DataType::strings(["fresh", "canned"]))
            .unwrap();
        let raw = RawTable::from_records(vec![record(&[("Name", Value::from("milk"))])]);
        assert!(matches!(
            Builder::new(&schema).build_table("foods", &raw),
            Err(TicDatError::Config(_))
        ));
    }

    #[test]
    fn test_positional_arity() {
        let schema = schema();
        let raw = RawTable::positional([vec!["only one"]]);
        assert!(Builder::new(&schema).build_table("foods", &raw).is_err());
        let log = RawTable::positional([vec!["b"], vec!["a"]]);
        let table = Builder::new(&schema).build_table("log", &log).unwrap();
        assert_eq!(table.append_only().unwrap()[0]["Message"], Value::from("b"));
    }
}

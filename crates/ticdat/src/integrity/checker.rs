//! Advisory checks of a table collection against its schema.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use super::report::{
    DataTypeFailure, DataTypeFailures, DuplicateReport, ForeignKeyFailure, ForeignKeyFailures,
    IntegrityReport, RowPredicateFailures,
};
use crate::dat::{Row, RowRef, TicDat};
use crate::error::Result;
use crate::schema::{ForeignKey, Schema, TableSpec};
use crate::value::{Key, Value};

/// Runs the integrity checks. None of the checks mutate the collection or
/// fail on bad data; they only report it.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityChecker<'a> {
    schema: &'a Schema,
}

impl<'a> IntegrityChecker<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Every cell whose value fails its field's data type.
    pub fn find_data_type_failures(&self, dat: &TicDat) -> DataTypeFailures {
        let mut failures = DataTypeFailures::new();
        for spec in self.schema.tables() {
            let Some(table) = dat.table(&spec.name) else {
                continue;
            };
            let mut by_field: IndexMap<String, DataTypeFailure> = IndexMap::new();
            for field in spec.all_fields() {
                let Some(data_type) = self.schema.data_type(&spec.name, field) else {
                    continue;
                };
                let mut failure = DataTypeFailure::default();
                for (row_ref, row) in table.rows() {
                    let value = field_value(spec, &row_ref, row, field).unwrap_or(&Value::Null);
                    if !data_type.matches(value) {
                        failure.bad_values.insert(value.clone());
                        failure.rows.push(row_ref);
                    }
                }
                if !failure.rows.is_empty() {
                    by_field.insert(field.to_string(), failure);
                }
            }
            if !by_field.is_empty() {
                failures.insert(spec.name.clone(), by_field);
            }
        }
        debug!(tables = failures.len(), "data type check finished");
        failures
    }

    /// Rows rejected by the table's registered row predicates.
    ///
    /// Predicates see the primary-key fields followed by the data fields.
    pub fn find_data_row_failures(&self, dat: &TicDat) -> RowPredicateFailures {
        let mut failures = RowPredicateFailures::new();
        for spec in self.schema.tables() {
            let predicates: Vec<_> = self.schema.data_row_predicates(&spec.name).collect();
            if predicates.is_empty() {
                continue;
            }
            let Some(table) = dat.table(&spec.name) else {
                continue;
            };
            let mut by_predicate: IndexMap<String, Vec<RowRef>> = IndexMap::new();
            for (row_ref, row) in table.rows() {
                let full = full_row(spec, &row_ref, row);
                for (name, predicate) in &predicates {
                    if !predicate(&full) {
                        by_predicate
                            .entry(name.to_string())
                            .or_default()
                            .push(row_ref.clone());
                    }
                }
            }
            if !by_predicate.is_empty() {
                failures.insert(spec.name.clone(), by_predicate);
            }
        }
        failures
    }

    /// Native rows whose mapped values match no foreign primary key.
    ///
    /// Rows with a null in any mapped native field are not failures.
    pub fn find_foreign_key_failures(&self, dat: &TicDat) -> ForeignKeyFailures {
        let mut failures = ForeignKeyFailures::new();
        for fk in self.schema.foreign_keys() {
            if let Some(failure) = self.foreign_key_failure(fk, dat) {
                failures.insert(fk.name.clone(), failure);
            }
        }
        failures
    }

    fn foreign_key_failure(&self, fk: &ForeignKey, dat: &TicDat) -> Option<ForeignKeyFailure> {
        let native_spec = self.schema.table(&fk.native_table)?;
        let foreign_spec = self.schema.table(&fk.foreign_table)?;
        let native = dat.table(&fk.native_table)?;

        let targets: HashSet<Key> = match dat.table(&fk.foreign_table) {
            Some(foreign) => foreign
                .rows()
                .filter_map(|(row_ref, row)| project(foreign_spec, &row_ref, row, fk.foreign_fields()))
                .collect(),
            None => HashSet::new(),
        };

        let mut values = IndexSet::new();
        let mut rows = Vec::new();
        for (row_ref, row) in native.rows() {
            let Some(key) = project(native_spec, &row_ref, row, fk.native_fields()) else {
                continue;
            };
            if key.values().iter().any(Value::is_null) {
                continue;
            }
            if !targets.contains(&key) {
                values.insert(key);
                rows.push(row_ref);
            }
        }
        if rows.is_empty() {
            return None;
        }
        Some(ForeignKeyFailure {
            native_table: fk.native_table.clone(),
            foreign_table: fk.foreign_table.clone(),
            cardinality: fk.cardinality,
            values,
            rows,
        })
    }

    /// Run the data type, row predicate and foreign key checks.
    ///
    /// Duplicates are only visible while reading a source; attach them with
    /// [`IntegrityReport::duplicates`] or use
    /// [`Builder::build_report`](crate::Builder::build_report).
    pub fn check(&self, dat: &TicDat) -> IntegrityReport {
        let report = IntegrityReport {
            data_types: self.find_data_type_failures(dat),
            row_predicates: self.find_data_row_failures(dat),
            foreign_keys: self.find_foreign_key_failures(dat),
            duplicates: DuplicateReport::new(),
        };
        info!(
            data_type_tables = report.data_types.len(),
            row_predicate_tables = report.row_predicates.len(),
            foreign_key_failures = report.foreign_keys.len(),
            "integrity check finished"
        );
        report
    }

    /// Delete native rows that fail a foreign key, repeating until none do,
    /// since a removal can orphan rows of tables that point at it.
    ///
    /// Returns the number of rows removed.
    pub fn remove_foreign_key_failures(&self, dat: &mut TicDat) -> Result<usize> {
        let mut removed = 0;
        loop {
            let failures = self.find_foreign_key_failures(dat);
            if failures.is_empty() {
                break;
            }
            // Indices refer to the tables as checked: one removal per table.
            let mut doomed: IndexMap<&str, Vec<RowRef>> = IndexMap::new();
            for failure in failures.values() {
                doomed
                    .entry(failure.native_table.as_str())
                    .or_default()
                    .extend(failure.rows.iter().cloned());
            }
            let mut pass = 0;
            for (table, rows) in &doomed {
                pass += dat.remove_rows(table, rows)?;
            }
            if pass == 0 {
                break;
            }
            removed += pass;
        }
        if removed > 0 {
            info!(rows = removed, "removed foreign key failures");
        }
        Ok(removed)
    }
}

/// A field's value: from the key for primary-key fields, else from the row.
fn field_value<'r>(
    spec: &TableSpec,
    row_ref: &'r RowRef,
    row: &'r Row,
    field: &str,
) -> Option<&'r Value> {
    if let (Some(i), RowRef::Key(key)) = (spec.primary_key.iter().position(|f| f == field), row_ref) {
        return key.values().get(i);
    }
    row.get(field)
}

fn project<'f>(
    spec: &TableSpec,
    row_ref: &RowRef,
    row: &Row,
    fields: impl Iterator<Item = &'f str>,
) -> Option<Key> {
    fields
        .map(|f| field_value(spec, row_ref, row, f).cloned())
        .collect::<Option<Vec<_>>>()
        .map(Key::new)
}

fn full_row(spec: &TableSpec, row_ref: &RowRef, row: &Row) -> Row {
    let mut full = Row::with_capacity(spec.field_count());
    if let RowRef::Key(key) = row_ref {
        for (field, value) in spec.primary_key.iter().zip(key.values()) {
            full.insert(field.clone(), value.clone());
        }
    }
    for (field, value) in row {
        full.insert(field.clone(), value.clone());
    }
    full
}

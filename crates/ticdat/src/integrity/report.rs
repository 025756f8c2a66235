//! Report types returned by the integrity checks.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::dat::RowRef;
use crate::schema::Cardinality;
use crate::value::{Key, Value};

/// Values of one field that fail its data type, and the rows holding them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataTypeFailure {
    pub bad_values: IndexSet<Value>,
    pub rows: Vec<RowRef>,
}

/// table -> field -> failure.
pub type DataTypeFailures = IndexMap<String, IndexMap<String, DataTypeFailure>>;

/// table -> predicate name -> failing rows.
pub type RowPredicateFailures = IndexMap<String, IndexMap<String, Vec<RowRef>>>;

/// Native rows whose mapped values have no match in the foreign table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyFailure {
    pub native_table: String,
    pub foreign_table: String,
    pub cardinality: Cardinality,
    /// Distinct unmatched native values, in native field order.
    pub values: IndexSet<Key>,
    pub rows: Vec<RowRef>,
}

/// foreign key name -> failure.
pub type ForeignKeyFailures = IndexMap<String, ForeignKeyFailure>;

/// Primary keys seen more than once while reading a source, per table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplicateReport {
    tables: IndexMap<String, IndexMap<Key, usize>>,
}

impl DuplicateReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the occurrence counts of one table, keeping counts above one.
    pub fn record(&mut self, table: &str, counts: IndexMap<Key, usize>) {
        let repeated: IndexMap<Key, usize> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
        if !repeated.is_empty() {
            self.tables.insert(table.to_string(), repeated);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, table: &str) -> Option<&IndexMap<Key, usize>> {
        self.tables.get(table)
    }

    pub fn count(&self, table: &str, key: impl Into<Key>) -> Option<usize> {
        self.tables.get(table)?.get(&key.into()).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<Key, usize>)> {
        self.tables.iter().map(|(t, c)| (t.as_str(), c))
    }
}

struct KeyCounts<'a>(&'a IndexMap<Key, usize>);

#[derive(Serialize)]
struct KeyCount<'a> {
    key: &'a Key,
    count: usize,
}

impl Serialize for KeyCounts<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for (key, &count) in self.0 {
            seq.serialize_element(&KeyCount { key, count })?;
        }
        seq.end()
    }
}

// Keys may be tuples, so each table serializes as a list of {key, count}.
impl Serialize for DuplicateReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (table, counts) in &self.tables {
            map.serialize_entry(table, &KeyCounts(counts))?;
        }
        map.end()
    }
}

/// Kind of integrity finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    DataType,
    RowPredicate,
    ForeignKey,
    Duplicate,
}

impl FindingKind {
    pub fn label(&self) -> &'static str {
        match self {
            FindingKind::DataType => "Data Type",
            FindingKind::RowPredicate => "Row Predicate",
            FindingKind::ForeignKey => "Foreign Key",
            FindingKind::Duplicate => "Duplicate",
        }
    }
}

/// Severity level of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The data was read, but something was silently discarded.
    Warning,
    /// The data violates the schema.
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// One line of an integrity report, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub table: String,
    /// Field, predicate or foreign key name.
    pub subject: String,
    /// Number of offending rows (or duplicated keys).
    pub rows: usize,
    pub detail: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}.{}: {}",
            self.severity.label(),
            self.kind.label(),
            self.table,
            self.subject,
            self.detail
        )
    }
}

/// All four integrity checks for one table collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrityReport {
    pub data_types: DataTypeFailures,
    pub row_predicates: RowPredicateFailures,
    pub foreign_keys: ForeignKeyFailures,
    pub duplicates: DuplicateReport,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.data_types.is_empty()
            && self.row_predicates.is_empty()
            && self.foreign_keys.is_empty()
            && self.duplicates.is_empty()
    }

    /// Flat list of findings, errors first.
    pub fn findings(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        for (table, fields) in &self.data_types {
            for (field, failure) in fields {
                findings.push(Finding {
                    kind: FindingKind::DataType,
                    severity: Severity::Error,
                    table: table.clone(),
                    subject: field.clone(),
                    rows: failure.rows.len(),
                    detail: format!("bad values {}", join(failure.bad_values.iter(), 5)),
                });
            }
        }

        for (table, predicates) in &self.row_predicates {
            for (name, rows) in predicates {
                findings.push(Finding {
                    kind: FindingKind::RowPredicate,
                    severity: Severity::Error,
                    table: table.clone(),
                    subject: name.clone(),
                    rows: rows.len(),
                    detail: format!("failing rows {}", join(rows.iter(), 5)),
                });
            }
        }

        for (name, failure) in &self.foreign_keys {
            findings.push(Finding {
                kind: FindingKind::ForeignKey,
                severity: Severity::Error,
                table: failure.native_table.clone(),
                subject: name.clone(),
                rows: failure.rows.len(),
                detail: format!(
                    "values {} have no match in {} ({})",
                    join(failure.values.iter(), 5),
                    failure.foreign_table,
                    failure.cardinality.label()
                ),
            });
        }

        for (table, counts) in self.duplicates.iter() {
            findings.push(Finding {
                kind: FindingKind::Duplicate,
                severity: Severity::Warning,
                table: table.to_string(),
                subject: "primary key".to_string(),
                rows: counts.len(),
                detail: format!(
                    "repeated keys {} (last occurrence kept)",
                    join(counts.iter().map(|(k, n)| format!("{} x{}", k, n)), 5)
                ),
            });
        }

        // Errors first, as the CLI prints them.
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        findings
    }
}

fn join<T: fmt::Display>(items: impl ExactSizeIterator<Item = T>, limit: usize) -> String {
    let total = items.len();
    let shown: Vec<String> = items.take(limit).map(|v| v.to_string()).collect();
    if total > limit {
        format!("{{{}, ... {} more}}", shown.join(", "), total - limit)
    } else {
        format!("{{{}}}", shown.join(", "))
    }
}

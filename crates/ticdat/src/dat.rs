//! In-memory table collections.

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::{Result, TicDatError};
use crate::schema::Schema;
use crate::value::{Key, Value};

/// Data fields of one row, in declaration order.
pub type Row = IndexMap<String, Value>;

/// Rows of one table.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    /// Rows indexed by primary key. A key appears at most once.
    Keyed(IndexMap<Key, Row>),
    /// Rows of a table without a primary key, in insertion order.
    AppendOnly(Vec<Row>),
}

impl Table {
    pub fn len(&self) -> usize {
        match self {
            Table::Keyed(rows) => rows.len(),
            Table::AppendOnly(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, Table::Keyed(_))
    }

    pub fn keyed(&self) -> Option<&IndexMap<Key, Row>> {
        match self {
            Table::Keyed(rows) => Some(rows),
            Table::AppendOnly(_) => None,
        }
    }

    pub fn append_only(&self) -> Option<&[Row]> {
        match self {
            Table::Keyed(_) => None,
            Table::AppendOnly(rows) => Some(rows),
        }
    }

    /// Every row with the reference that identifies it.
    pub fn rows(&self) -> Box<dyn Iterator<Item = (RowRef, &Row)> + '_> {
        match self {
            Table::Keyed(rows) => Box::new(rows.iter().map(|(k, r)| (RowRef::Key(k.clone()), r))),
            Table::AppendOnly(rows) => {
                Box::new(rows.iter().enumerate().map(|(i, r)| (RowRef::Index(i), r)))
            }
        }
    }

    fn empty_like(keyed: bool) -> Self {
        if keyed {
            Table::Keyed(IndexMap::new())
        } else {
            Table::AppendOnly(Vec::new())
        }
    }
}

/// Identifies a row: its primary key, or its position in an append-only table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowRef {
    Key(Key),
    Index(usize),
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRef::Key(key) => write!(f, "{}", key),
            RowRef::Index(i) => write!(f, "#{}", i),
        }
    }
}

impl Serialize for RowRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RowRef::Key(key) => key.serialize(serializer),
            RowRef::Index(i) => serializer.serialize_u64(*i as u64),
        }
    }
}

/// A collection holding one table per schema table.
///
/// Rows carry data fields only; primary-key values live in the [`Key`].
/// Once frozen, every mutation fails with [`TicDatError::Frozen`].
#[derive(Debug, Clone, PartialEq)]
pub struct TicDat {
    tables: IndexMap<String, Table>,
    frozen: bool,
}

impl TicDat {
    /// Empty tables for every table in `schema`.
    pub fn new(schema: &Schema) -> Self {
        let tables = schema
            .tables()
            .map(|spec| (spec.name.clone(), Table::empty_like(spec.is_keyed())))
            .collect();
        Self {
            tables,
            frozen: false,
        }
    }

    pub(crate) fn from_tables(tables: IndexMap<String, Table>) -> Self {
        Self {
            tables,
            frozen: false,
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Row of a keyed table.
    pub fn get(&self, table: &str, key: impl Into<Key>) -> Option<&Row> {
        self.table(table)?.keyed()?.get(&key.into())
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Table> {
        if self.frozen {
            return Err(TicDatError::Frozen {
                table: table.to_string(),
            });
        }
        self.tables
            .get_mut(table)
            .ok_or_else(|| TicDatError::UnknownTable(table.to_string()))
    }

    fn keyed_mut(&mut self, table: &str) -> Result<&mut IndexMap<Key, Row>> {
        match self.table_mut(table)? {
            Table::Keyed(rows) => Ok(rows),
            Table::AppendOnly(_) => Err(TicDatError::construction(
                table,
                "append-only tables are not indexed by key",
            )),
        }
    }

    fn append_only_mut(&mut self, table: &str) -> Result<&mut Vec<Row>> {
        match self.table_mut(table)? {
            Table::AppendOnly(rows) => Ok(rows),
            Table::Keyed(_) => Err(TicDatError::construction(
                table,
                "keyed tables must be written by key",
            )),
        }
    }

    /// Insert or replace a keyed row. Returns the replaced row.
    pub fn insert(&mut self, table: &str, key: impl Into<Key>, row: Row) -> Result<Option<Row>> {
        Ok(self.keyed_mut(table)?.insert(key.into(), row))
    }

    /// Set one data field of an existing keyed row.
    pub fn set_field(
        &mut self,
        table: &str,
        key: impl Into<Key>,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let key = key.into();
        let rows = self.keyed_mut(table)?;
        let row = rows
            .get_mut(&key)
            .ok_or_else(|| TicDatError::construction(table, format!("no row with key {}", key)))?;
        set_existing_field(table, row, field, value.into())
    }

    /// Remove a keyed row, preserving the order of the others.
    pub fn remove(&mut self, table: &str, key: impl Into<Key>) -> Result<Option<Row>> {
        Ok(self.keyed_mut(table)?.shift_remove(&key.into()))
    }

    /// Append a row to an append-only table.
    pub fn push(&mut self, table: &str, row: Row) -> Result<()> {
        self.append_only_mut(table)?.push(row);
        Ok(())
    }

    /// Set one data field of an append-only row by position.
    pub fn set_row_field(
        &mut self,
        table: &str,
        index: usize,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let rows = self.append_only_mut(table)?;
        let row = rows
            .get_mut(index)
            .ok_or_else(|| TicDatError::construction(table, format!("no row at index {}", index)))?;
        set_existing_field(table, row, field, value.into())
    }

    /// Remove every row of a table.
    pub fn clear(&mut self, table: &str) -> Result<()> {
        match self.table_mut(table)? {
            Table::Keyed(rows) => rows.clear(),
            Table::AppendOnly(rows) => rows.clear(),
        }
        Ok(())
    }

    /// Remove the referenced rows. Returns how many were removed.
    pub fn remove_rows(&mut self, table: &str, rows: &[RowRef]) -> Result<usize> {
        let target = self.table_mut(table)?;
        let before = target.len();
        match &mut *target {
            Table::Keyed(keyed) => {
                for row in rows {
                    if let RowRef::Key(key) = row {
                        keyed.shift_remove(key);
                    }
                }
            }
            Table::AppendOnly(list) => {
                let mut doomed: Vec<usize> = rows
                    .iter()
                    .filter_map(|r| match r {
                        RowRef::Index(i) => Some(*i),
                        RowRef::Key(_) => None,
                    })
                    .collect();
                doomed.sort_unstable();
                doomed.dedup();
                for i in doomed.into_iter().rev() {
                    if i < list.len() {
                        list.remove(i);
                    }
                }
            }
        }
        Ok(before - target.len())
    }

    /// Freeze the collection against further mutation.
    pub fn freeze(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// A mutable deep copy, regardless of this collection's state.
    pub fn thaw_copy(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            frozen: false,
        }
    }

    /// True if both collections hold the same rows, ignoring row order and
    /// frozen state.
    pub fn same_data(&self, other: &TicDat) -> bool {
        if self.tables.len() != other.tables.len() {
            return false;
        }
        self.tables.iter().all(|(name, table)| {
            let Some(theirs) = other.tables.get(name) else {
                return false;
            };
            match (table, theirs) {
                (Table::Keyed(a), Table::Keyed(b)) => {
                    a.len() == b.len()
                        && a.iter().all(|(k, row)| b.get(k).is_some_and(|r| same_row(row, r)))
                }
                (Table::AppendOnly(a), Table::AppendOnly(b)) => same_multiset(a, b),
                _ => false,
            }
        })
    }
}

fn set_existing_field(table: &str, row: &mut Row, field: &str, value: Value) -> Result<()> {
    match row.get_mut(field) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(TicDatError::UnknownField {
            table: table.to_string(),
            field: field.to_string(),
        }),
    }
}

fn same_row(a: &Row, b: &Row) -> bool {
    a.len() == b.len() && a.iter().all(|(f, v)| b.get(f) == Some(v))
}

fn same_multiset(a: &[Row], b: &[Row]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&Row> = b.iter().collect();
    for row in a {
        match unmatched.iter().position(|r| same_row(row, r)) {
            Some(i) => {
                unmatched.swap_remove(i);
            }
            None => return false,
        }
    }
    true
}

/// Build a [`Row`] from field/value pairs.
pub fn row<I, F, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (F, V)>,
    F: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(f, v)| (f.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_table("foods", ["Name"], ["Cost"]).unwrap();
        schema.add_table("log", Vec::<String>::new(), ["Message"]).unwrap();
        schema
    }

    #[test]
    fn test_new_has_every_table() {
        let dat = TicDat::new(&schema());
        assert_eq!(dat.table_names().collect::<Vec<_>>(), vec!["foods", "log"]);
        assert!(dat.table("foods").unwrap().is_keyed());
        assert!(!dat.table("log").unwrap().is_keyed());
    }

    #[test]
    fn test_keyed_mutation() {
        let mut dat = TicDat::new(&schema());
        dat.insert("foods", "milk", row([("Cost", 0.89)])).unwrap();
        dat.set_field("foods", "milk", "Cost", 0.95).unwrap();
        assert_eq!(dat.get("foods", "milk").unwrap()["Cost"], Value::Float(0.95));
        assert!(matches!(
            dat.set_field("foods", "milk", "Price", 1.0),
            Err(TicDatError::UnknownField { .. })
        ));
        assert!(dat.remove("foods", "milk").unwrap().is_some());
        assert!(dat.push("foods", row([("Cost", 1.0)])).is_err());
    }

    #[test]
    fn test_frozen_rejects_mutation() {
        let mut dat = TicDat::new(&schema());
        dat.push("log", row([("Message", "hello")])).unwrap();
        let mut frozen = dat.freeze();
        assert!(matches!(
            frozen.push("log", row([("Message", "again")])),
            Err(TicDatError::Frozen { .. })
        ));
        assert!(matches!(
            frozen.set_row_field("log", 0, "Message", "x"),
            Err(TicDatError::Frozen { .. })
        ));
        assert!(matches!(frozen.clear("log"), Err(TicDatError::Frozen { .. })));

        let mut copy = frozen.thaw_copy();
        copy.set_row_field("log", 0, "Message", "edited").unwrap();
        assert_eq!(
            frozen.table("log").unwrap().append_only().unwrap()[0]["Message"],
            Value::from("hello")
        );
    }

    #[test]
    fn test_remove_rows_by_index() {
        let mut dat = TicDat::new(&schema());
        for m in ["a", "b", "c"] {
            dat.push("log", row([("Message", m)])).unwrap();
        }
        let removed = dat
            .remove_rows("log", &[RowRef::Index(2), RowRef::Index(0), RowRef::Index(0)])
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            dat.table("log").unwrap().append_only().unwrap()[0]["Message"],
            Value::from("b")
        );
    }

    #[test]
    fn test_same_data_ignores_order() {
        let schema = schema();
        let mut a = TicDat::new(&schema);
        let mut b = TicDat::new(&schema);
        a.push("log", row([("Message", "x")])).unwrap();
        a.push("log", row([("Message", "y")])).unwrap();
        b.push("log", row([("Message", "y")])).unwrap();
        b.push("log", row([("Message", "x")])).unwrap();
        assert!(a.same_data(&b.freeze()));
    }
}

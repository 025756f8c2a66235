//! Schema registry: tables, fields, data types, defaults and foreign keys.

mod definition;
mod table;
mod types;

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

pub use definition::{ForeignKeyDefinition, SchemaDefinition, TableDefinition};
pub use table::{Cardinality, FieldMapping, ForeignKey, TableSpec};
pub use types::{DataType, DataTypeSpec, StringsAllowed, Wildcard};

use crate::dat::{Row, Table, TicDat};
use crate::error::{Result, TicDatError};
use crate::normalize::InfinityIoFlag;
use crate::value::Value;

/// A named predicate over a full row (primary-key and data fields).
pub type RowPredicate = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// Relational schema plus the per-instance I/O settings that go with it.
///
/// Cloning produces an independent registry; predicates are shared but
/// immutable.
#[derive(Clone)]
pub struct Schema {
    tables: IndexMap<String, TableSpec>,
    data_types: IndexMap<String, IndexMap<String, DataType>>,
    default_values: IndexMap<String, IndexMap<String, Value>>,
    foreign_keys: Vec<ForeignKey>,
    predicates: IndexMap<String, IndexMap<String, RowPredicate>>,
    infinity_io_flag: InfinityIoFlag,
    empty_string_as_null: bool,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self {
            tables: IndexMap::new(),
            data_types: IndexMap::new(),
            default_values: IndexMap::new(),
            foreign_keys: Vec::new(),
            predicates: IndexMap::new(),
            infinity_io_flag: InfinityIoFlag::default(),
            empty_string_as_null: true,
        }
    }

    /// Load a JSON schema document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|e| TicDatError::io(path, e))?;
        let definition: SchemaDefinition = serde_json::from_slice(&contents)?;
        Self::from_definition(&definition)
    }

    /// Declare a table. An empty primary key makes it append-only.
    pub fn add_table<P, D>(&mut self, name: &str, primary_key: P, data: D) -> Result<()>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        if name.is_empty() {
            return Err(TicDatError::config("table names must be non-empty"));
        }
        if self.tables.contains_key(name) {
            return Err(TicDatError::config(format!("duplicate table '{}'", name)));
        }
        let primary_key: Vec<String> = primary_key.into_iter().map(Into::into).collect();
        let data: Vec<String> = data.into_iter().map(Into::into).collect();

        let mut seen = HashSet::new();
        for field in primary_key.iter().chain(data.iter()) {
            if field.is_empty() {
                return Err(TicDatError::config(format!(
                    "table '{}' has an empty field name",
                    name
                )));
            }
            if !seen.insert(field.as_str()) {
                return Err(TicDatError::config(format!(
                    "field '{}' is declared more than once on table '{}'",
                    field, name
                )));
            }
        }

        self.tables.insert(
            name.to_string(),
            TableSpec {
                name: name.to_string(),
                primary_key,
                data,
            },
        );
        Ok(())
    }

    /// All declared tables, in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &TableSpec> {
        self.tables.values()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Like [`Schema::table`], failing for undeclared tables.
    pub fn table_spec(&self, name: &str) -> Result<&TableSpec> {
        self.tables
            .get(name)
            .ok_or_else(|| TicDatError::UnknownTable(name.to_string()))
    }

    fn field_spec(&self, table: &str, field: &str) -> Result<&TableSpec> {
        let spec = self.table_spec(table)?;
        if spec.has_field(field) {
            Ok(spec)
        } else {
            Err(TicDatError::UnknownField {
                table: table.to_string(),
                field: field.to_string(),
            })
        }
    }

    /// Declare a foreign key named `native(fields)->foreign(fields)`.
    ///
    /// `mappings` pairs native fields with foreign primary-key fields.
    pub fn add_foreign_key(
        &mut self,
        native_table: &str,
        foreign_table: &str,
        mappings: &[(&str, &str)],
    ) -> Result<&ForeignKey> {
        let field_mappings = to_field_mappings(mappings);
        let name = ForeignKey::default_name(native_table, foreign_table, &field_mappings);
        self.push_foreign_key(name, native_table, foreign_table, field_mappings)
    }

    /// Declare a foreign key with an explicit name.
    pub fn add_named_foreign_key(
        &mut self,
        name: &str,
        native_table: &str,
        foreign_table: &str,
        mappings: &[(&str, &str)],
    ) -> Result<&ForeignKey> {
        if name.is_empty() {
            return Err(TicDatError::config("foreign key names must be non-empty"));
        }
        self.push_foreign_key(
            name.to_string(),
            native_table,
            foreign_table,
            to_field_mappings(mappings),
        )
    }

    fn push_foreign_key(
        &mut self,
        name: String,
        native_table: &str,
        foreign_table: &str,
        mappings: Vec<FieldMapping>,
    ) -> Result<&ForeignKey> {
        let native = self.table_spec(native_table)?;
        let foreign = self.table_spec(foreign_table)?;
        if mappings.is_empty() {
            return Err(TicDatError::config(format!(
                "foreign key '{}' needs at least one field mapping",
                name
            )));
        }
        if self.foreign_keys.iter().any(|fk| fk.name == name) {
            return Err(TicDatError::config(format!(
                "duplicate foreign key '{}'",
                name
            )));
        }

        let mut natives = HashSet::new();
        let mut foreigns = HashSet::new();
        for mapping in &mappings {
            if !native.has_field(&mapping.native) {
                return Err(TicDatError::UnknownField {
                    table: native_table.to_string(),
                    field: mapping.native.clone(),
                });
            }
            if !foreign.is_primary_key_field(&mapping.foreign) {
                return Err(TicDatError::config(format!(
                    "foreign key '{}' maps onto '{}.{}', which is not a primary key field",
                    name, foreign_table, mapping.foreign
                )));
            }
            if !natives.insert(mapping.native.as_str()) || !foreigns.insert(mapping.foreign.as_str())
            {
                return Err(TicDatError::config(format!(
                    "foreign key '{}' repeats a field",
                    name
                )));
            }
        }

        let full_foreign_key = foreigns.len() == foreign.primary_key.len();
        let native_is_key = native.is_keyed()
            && natives.len() == native.primary_key.len()
            && native.primary_key.iter().all(|f| natives.contains(f.as_str()));
        let cardinality = match (full_foreign_key, native_is_key) {
            (true, true) => Cardinality::OneToOne,
            (true, false) => Cardinality::ManyToOne,
            (false, _) => Cardinality::ManyToMany,
        };

        self.foreign_keys.push(ForeignKey {
            name,
            native_table: native_table.to_string(),
            foreign_table: foreign_table.to_string(),
            mappings,
            cardinality,
        });
        let index = self.foreign_keys.len() - 1;
        Ok(&self.foreign_keys[index])
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Replace the descriptor for a field.
    pub fn set_data_type(&mut self, table: &str, field: &str, data_type: DataType) -> Result<()> {
        self.field_spec(table, field)?;
        self.data_types
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), data_type);
        Ok(())
    }

    /// Remove a field's descriptor, leaving it unconstrained.
    pub fn clear_data_type(&mut self, table: &str, field: &str) -> Result<Option<DataType>> {
        self.field_spec(table, field)?;
        Ok(self
            .data_types
            .get_mut(table)
            .and_then(|fields| fields.shift_remove(field)))
    }

    pub fn data_type(&self, table: &str, field: &str) -> Option<&DataType> {
        self.data_types.get(table)?.get(field)
    }

    /// Declare the value used when a data field is omitted.
    ///
    /// The value is checked against the field's descriptor when it is first
    /// applied, not here, so descriptors may be declared in either order.
    pub fn set_default_value(
        &mut self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let spec = self.field_spec(table, field)?;
        if !spec.is_data_field(field) {
            return Err(TicDatError::config(format!(
                "'{}.{}' is a primary key field and cannot have a default",
                table, field
            )));
        }
        self.default_values
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
        Ok(())
    }

    /// The explicitly declared default, if any.
    pub fn declared_default(&self, table: &str, field: &str) -> Option<&Value> {
        self.default_values.get(table)?.get(field)
    }

    /// The default applied to an omitted data field: the declared default,
    /// validated against the current descriptor, or zero.
    pub fn default_value(&self, table: &str, field: &str) -> Result<Value> {
        let Some(value) = self.declared_default(table, field) else {
            return Ok(Value::Int(0));
        };
        if let Some(dt) = self.data_type(table, field) {
            if !dt.matches(value) {
                return Err(TicDatError::config(format!(
                    "default value {} for '{}.{}' does not match its data type",
                    value, table, field
                )));
            }
        }
        Ok(value.clone())
    }

    /// Register a named cross-field predicate for a table.
    pub fn add_data_row_predicate<F>(&mut self, table: &str, name: &str, predicate: F) -> Result<()>
    where
        F: Fn(&Row) -> bool + Send + Sync + 'static,
    {
        self.table_spec(table)?;
        if name.is_empty() {
            return Err(TicDatError::config("predicate names must be non-empty"));
        }
        let predicates = self.predicates.entry(table.to_string()).or_default();
        if predicates.contains_key(name) {
            return Err(TicDatError::config(format!(
                "duplicate predicate '{}' on table '{}'",
                name, table
            )));
        }
        predicates.insert(name.to_string(), Arc::new(predicate));
        Ok(())
    }

    pub fn data_row_predicates(&self, table: &str) -> impl Iterator<Item = (&str, &RowPredicate)> {
        self.predicates
            .get(table)
            .into_iter()
            .flat_map(|p| p.iter().map(|(name, f)| (name.as_str(), f)))
    }

    pub fn infinity_io_flag(&self) -> InfinityIoFlag {
        self.infinity_io_flag
    }

    pub fn set_infinity_io_flag(&mut self, flag: InfinityIoFlag) -> Result<()> {
        flag.validate().map_err(TicDatError::Config)?;
        self.infinity_io_flag = flag;
        Ok(())
    }

    pub fn empty_string_as_null(&self) -> bool {
        self.empty_string_as_null
    }

    pub fn set_empty_string_as_null(&mut self, enabled: bool) {
        self.empty_string_as_null = enabled;
    }

    /// An empty table collection for this schema.
    pub fn tic_dat(&self) -> TicDat {
        TicDat::new(self)
    }

    /// Verify that a collection has exactly this schema's tables and shapes.
    pub fn good_tic_dat(&self, dat: &TicDat) -> Result<()> {
        for name in dat.table_names() {
            if self.table(name).is_none() {
                return Err(TicDatError::UnknownTable(name.to_string()));
            }
        }
        for spec in self.tables() {
            let table = dat
                .table(&spec.name)
                .ok_or_else(|| TicDatError::construction(&spec.name, "table is missing"))?;
            match table {
                Table::Keyed(rows) => {
                    if !spec.is_keyed() {
                        return Err(TicDatError::construction(
                            &spec.name,
                            "append-only table holds keyed rows",
                        ));
                    }
                    for (key, row) in rows {
                        if key.len() != spec.primary_key.len() {
                            return Err(TicDatError::construction(
                                &spec.name,
                                format!("key {} does not have {} fields", key, spec.primary_key.len()),
                            ));
                        }
                        check_row_fields(spec, row)?;
                    }
                }
                Table::AppendOnly(rows) => {
                    if spec.is_keyed() {
                        return Err(TicDatError::construction(
                            &spec.name,
                            "keyed table holds append-only rows",
                        ));
                    }
                    for row in rows {
                        check_row_fields(spec, row)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_row_fields(spec: &TableSpec, row: &Row) -> Result<()> {
    if row.len() == spec.data.len() && spec.data.iter().all(|f| row.contains_key(f)) {
        Ok(())
    } else {
        let fields: Vec<&str> = row.keys().map(String::as_str).collect();
        Err(TicDatError::construction(
            &spec.name,
            format!(
                "row fields [{}] do not match data fields [{}]",
                fields.join(", "),
                spec.data.join(", ")
            ),
        ))
    }
}

fn to_field_mappings(mappings: &[(&str, &str)]) -> Vec<FieldMapping> {
    mappings
        .iter()
        .map(|(native, foreign)| FieldMapping {
            native: native.to_string(),
            foreign: foreign.to_string(),
        })
        .collect()
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let predicates: IndexMap<&str, Vec<&str>> = self
            .predicates
            .iter()
            .map(|(t, p)| (t.as_str(), p.keys().map(String::as_str).collect()))
            .collect();
        f.debug_struct("Schema")
            .field("tables", &self.tables)
            .field("data_types", &self.data_types)
            .field("default_values", &self.default_values)
            .field("foreign_keys", &self.foreign_keys)
            .field("predicates", &predicates)
            .field("infinity_io_flag", &self.infinity_io_flag)
            .field("empty_string_as_null", &self.empty_string_as_null)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diet() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_table("categories", ["Name"], ["Min", "Max"])
            .unwrap();
        schema.add_table("foods", ["Name"], ["Cost"]).unwrap();
        schema
            .add_table("nutrition", ["Food", "Category"], ["Quantity"])
            .unwrap();
        schema
    }

    #[test]
    fn test_rejects_bad_tables() {
        let mut schema = diet();
        assert!(matches!(
            schema.add_table("foods", ["Name"], ["Cost"]),
            Err(TicDatError::Config(_))
        ));
        assert!(schema.add_table("", ["a"], ["b"]).is_err());
        assert!(schema.add_table("overlap", ["a"], ["a"]).is_err());
        assert!(schema.add_table("blank", [""], ["b"]).is_err());
    }

    #[test]
    fn test_foreign_key_cardinality() {
        let mut schema = diet();
        let fk = schema
            .add_foreign_key("nutrition", "foods", &[("Food", "Name")])
            .unwrap();
        assert_eq!(fk.cardinality, Cardinality::ManyToOne);
        assert_eq!(fk.name, "nutrition(Food)->foods(Name)");

        schema.add_table("food_notes", ["Food"], ["Note"]).unwrap();
        let fk = schema
            .add_foreign_key("food_notes", "foods", &[("Food", "Name")])
            .unwrap();
        assert_eq!(fk.cardinality, Cardinality::OneToOne);

        let fk = schema
            .add_foreign_key("foods", "nutrition", &[("Name", "Food")])
            .unwrap();
        assert_eq!(fk.cardinality, Cardinality::ManyToMany);
    }

    #[test]
    fn test_foreign_key_errors() {
        let mut schema = diet();
        assert!(matches!(
            schema.add_foreign_key("nutrition", "missing", &[("Food", "Name")]),
            Err(TicDatError::UnknownTable(_))
        ));
        assert!(matches!(
            schema.add_foreign_key("nutrition", "foods", &[("Nope", "Name")]),
            Err(TicDatError::UnknownField { .. })
        ));
        assert!(matches!(
            schema.add_foreign_key("nutrition", "foods", &[("Food", "Cost")]),
            Err(TicDatError::Config(_))
        ));
        schema
            .add_named_foreign_key("fk", "nutrition", "foods", &[("Food", "Name")])
            .unwrap();
        assert!(
            schema
                .add_named_foreign_key("fk", "nutrition", "categories", &[("Category", "Name")])
                .is_err()
        );
    }

    #[test]
    fn test_default_checked_when_applied() {
        let mut schema = diet();
        schema.set_default_value("foods", "Cost", -1.0).unwrap();
        assert!(schema.default_value("foods", "Cost").is_ok());
        schema
            .set_data_type("foods", "Cost", DataType::number())
            .unwrap();
        assert!(matches!(
            schema.default_value("foods", "Cost"),
            Err(TicDatError::Config(_))
        ));
        assert_eq!(schema.default_value("categories", "Min").unwrap(), Value::Int(0));
        assert!(schema.set_default_value("foods", "Name", "x").is_err());
    }

    #[test]
    fn test_clone_is_independent() {
        let schema = diet();
        let mut copy = schema.clone();
        copy.set_data_type("foods", "Cost", DataType::integer()).unwrap();
        copy.set_infinity_io_flag(InfinityIoFlag::Null).unwrap();
        assert!(schema.data_type("foods", "Cost").is_none());
        assert_eq!(schema.infinity_io_flag(), InfinityIoFlag::NotApplicable);
    }

    #[test]
    fn test_set_data_type_unknown_field() {
        let mut schema = diet();
        assert!(matches!(
            schema.set_data_type("foods", "Price", DataType::number()),
            Err(TicDatError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_invalid_sentinel() {
        let mut schema = diet();
        assert!(
            schema
                .set_infinity_io_flag(InfinityIoFlag::Sentinel(0.0))
                .is_err()
        );
    }
}

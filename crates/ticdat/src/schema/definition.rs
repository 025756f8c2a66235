//! Serializable schema documents.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::table::FieldMapping;
use super::types::{DataType, DataTypeSpec};
use super::Schema;
use crate::error::{Result, TicDatError};
use crate::normalize::InfinityIoFlag;
use crate::value::Value;

/// Fields of one table in a schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub data: Vec<String>,
}

/// A foreign key in a schema document. The name is derived when omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub native_table: String,
    pub foreign_table: String,
    pub mappings: Vec<FieldMapping>,
}

/// JSON form of a [`Schema`].
///
/// Row predicates are code and have no document form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub tables: IndexMap<String, TableDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub data_types: IndexMap<String, IndexMap<String, DataTypeSpec>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub default_values: IndexMap<String, IndexMap<String, serde_json::Value>>,
    #[serde(default)]
    pub infinity_io_flag: InfinityIoFlag,
    #[serde(default = "default_true")]
    pub empty_string_as_null: bool,
}

fn default_true() -> bool {
    true
}

impl Schema {
    /// Build a schema from its document form.
    pub fn from_definition(definition: &SchemaDefinition) -> Result<Self> {
        let mut schema = Schema::new();
        for (name, table) in &definition.tables {
            schema.add_table(name, table.primary_key.clone(), table.data.clone())?;
        }
        for fk in &definition.foreign_keys {
            let mappings: Vec<(&str, &str)> = fk
                .mappings
                .iter()
                .map(|m| (m.native.as_str(), m.foreign.as_str()))
                .collect();
            match &fk.name {
                Some(name) => {
                    schema.add_named_foreign_key(name, &fk.native_table, &fk.foreign_table, &mappings)?
                }
                None => schema.add_foreign_key(&fk.native_table, &fk.foreign_table, &mappings)?,
            };
        }
        for (table, fields) in &definition.data_types {
            for (field, spec) in fields {
                schema.set_data_type(table, field, DataType::new(spec.clone())?)?;
            }
        }
        for (table, fields) in &definition.default_values {
            for (field, json) in fields {
                let value = default_from_json(json).ok_or_else(|| {
                    TicDatError::config(format!(
                        "default value for '{}.{}' must be a scalar",
                        table, field
                    ))
                })?;
                schema.set_default_value(table, field, value)?;
            }
        }
        schema.set_infinity_io_flag(definition.infinity_io_flag)?;
        schema.set_empty_string_as_null(definition.empty_string_as_null);
        Ok(schema)
    }

    /// Document form of this schema.
    pub fn to_definition(&self) -> SchemaDefinition {
        let tables = self
            .tables
            .values()
            .map(|t| {
                (
                    t.name.clone(),
                    TableDefinition {
                        primary_key: t.primary_key.clone(),
                        data: t.data.clone(),
                    },
                )
            })
            .collect();
        let foreign_keys = self
            .foreign_keys
            .iter()
            .map(|fk| ForeignKeyDefinition {
                name: Some(fk.name.clone()),
                native_table: fk.native_table.clone(),
                foreign_table: fk.foreign_table.clone(),
                mappings: fk.mappings.clone(),
            })
            .collect();
        let data_types = self
            .data_types
            .iter()
            .map(|(t, fields)| {
                let specs = fields
                    .iter()
                    .map(|(f, dt)| (f.clone(), dt.spec().clone()))
                    .collect();
                (t.clone(), specs)
            })
            .collect();
        let default_values = self
            .default_values
            .iter()
            .map(|(t, fields)| {
                let values = fields.iter().map(|(f, v)| (f.clone(), v.to_json())).collect();
                (t.clone(), values)
            })
            .collect();
        SchemaDefinition {
            tables,
            foreign_keys,
            data_types,
            default_values,
            infinity_io_flag: self.infinity_io_flag,
            empty_string_as_null: self.empty_string_as_null,
        }
    }
}

/// Defaults may spell infinity as text, since JSON numbers cannot.
fn default_from_json(json: &serde_json::Value) -> Option<Value> {
    match json.as_str().map(str::to_ascii_lowercase).as_deref() {
        Some("inf") | Some("infinity") => Some(Value::Float(f64::INFINITY)),
        Some("-inf") | Some("-infinity") => Some(Value::Float(f64::NEG_INFINITY)),
        _ => Value::from_json(json),
    }
}

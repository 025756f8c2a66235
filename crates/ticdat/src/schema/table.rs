//! Table-level schema definitions and foreign keys.

use serde::{Deserialize, Serialize};

/// Declared fields of a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name.
    pub name: String,
    /// Ordered primary-key field names. Empty for append-only tables.
    pub primary_key: Vec<String>,
    /// Ordered data field names.
    pub data: Vec<String>,
}

impl TableSpec {
    /// True if the table has at least one primary-key field.
    pub fn is_keyed(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Primary-key fields followed by data fields.
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.primary_key
            .iter()
            .chain(self.data.iter())
            .map(String::as_str)
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize {
        self.primary_key.len() + self.data.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.all_fields().any(|f| f == field)
    }

    pub fn is_primary_key_field(&self, field: &str) -> bool {
        self.primary_key.iter().any(|f| f == field)
    }

    pub fn is_data_field(&self, field: &str) -> bool {
        self.data.iter().any(|f| f == field)
    }
}

/// Relationship shape of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// Native fields are the native primary key; foreign fields the full foreign key.
    OneToOne,
    /// Foreign fields are the full foreign primary key.
    ManyToOne,
    /// Foreign fields are a strict subset of the foreign primary key.
    ManyToMany,
}

impl Cardinality {
    pub fn label(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "one-to-one",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::ManyToMany => "many-to-many",
        }
    }
}

/// One native field mapped onto one foreign primary-key field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub native: String,
    pub foreign: String,
}

/// Declared reference from one table's fields to another table's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub native_table: String,
    pub foreign_table: String,
    pub mappings: Vec<FieldMapping>,
    pub cardinality: Cardinality,
}

impl ForeignKey {
    /// Name used when none is given: `native(f1,f2)->foreign(g1,g2)`.
    pub fn default_name(native_table: &str, foreign_table: &str, mappings: &[FieldMapping]) -> String {
        let natives: Vec<&str> = mappings.iter().map(|m| m.native.as_str()).collect();
        let foreigns: Vec<&str> = mappings.iter().map(|m| m.foreign.as_str()).collect();
        format!(
            "{}({})->{}({})",
            native_table,
            natives.join(","),
            foreign_table,
            foreigns.join(",")
        )
    }

    pub fn native_fields(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.native.as_str())
    }

    pub fn foreign_fields(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.foreign.as_str())
    }
}

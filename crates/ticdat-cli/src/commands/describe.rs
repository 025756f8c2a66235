//! Describe command - summarize a schema document.

use std::path::PathBuf;

use colored::Colorize;
use ticdat::schema::StringsAllowed;
use ticdat::{DataType, Schema};

pub fn run(schema_path: PathBuf, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Schema::load(&schema_path)?;

    if json_output {
        let foreign_keys: Vec<_> = schema
            .foreign_keys()
            .iter()
            .map(|fk| {
                serde_json::json!({
                    "name": fk.name,
                    "native_table": fk.native_table,
                    "foreign_table": fk.foreign_table,
                    "native_fields": fk.native_fields().collect::<Vec<_>>(),
                    "foreign_fields": fk.foreign_fields().collect::<Vec<_>>(),
                    "cardinality": fk.cardinality,
                })
            })
            .collect();
        let output = serde_json::json!({
            "schema": schema.to_definition(),
            "foreign_keys": foreign_keys,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Schema".cyan().bold(),
        schema_path.display().to_string().white()
    );
    println!();

    for spec in schema.tables() {
        let shape = if spec.is_keyed() { "" } else { " (append-only)" };
        println!("{}{}", spec.name.yellow().bold(), shape.dimmed());
        for field in spec.all_fields() {
            let marker = if spec.is_primary_key_field(field) { "*" } else { " " };
            let summary = schema
                .data_type(&spec.name, field)
                .map(summarize)
                .unwrap_or_else(|| "untyped".to_string());
            let default = schema
                .declared_default(&spec.name, field)
                .map(|v| format!(" default {}", v))
                .unwrap_or_default();
            println!("  {} {:<24} {}{}", marker.cyan(), field, summary, default.dimmed());
        }
        let predicates: Vec<_> = schema.data_row_predicates(&spec.name).map(|(n, _)| n).collect();
        if !predicates.is_empty() {
            println!("  row predicates: {}", predicates.join(", "));
        }
        println!();
    }

    if !schema.foreign_keys().is_empty() {
        println!("{}", "Foreign keys:".yellow().bold());
        for fk in schema.foreign_keys() {
            println!(
                "  {} {}({}) -> {}({}) {}",
                fk.name.white(),
                fk.native_table,
                fk.native_fields().collect::<Vec<_>>().join(", "),
                fk.foreign_table,
                fk.foreign_fields().collect::<Vec<_>>().join(", "),
                fk.cardinality.label().dimmed()
            );
        }
        println!();
    }

    println!("Infinity I/O flag: {}", schema.infinity_io_flag().to_string().cyan());
    println!(
        "Empty string as null: {}",
        schema.empty_string_as_null().to_string().cyan()
    );
    Ok(())
}

/// One-line description of a field type.
fn summarize(data_type: &DataType) -> String {
    let spec = data_type.spec();
    let mut parts = Vec::new();

    if data_type.is_datetime() {
        parts.push("datetime".to_string());
    }
    if spec.number_allowed {
        let kind = if spec.must_be_int { "integer" } else { "number" };
        let open = if spec.inclusive_min { '[' } else { '(' };
        let close = if spec.inclusive_max { ']' } else { ')' };
        parts.push(format!("{} {}{}, {}{}", kind, open, spec.min, spec.max, close));
    }
    match &spec.strings_allowed {
        StringsAllowed::Any(_) => parts.push("any string".to_string()),
        StringsAllowed::Set(set) if !set.is_empty() => {
            let values: Vec<_> = set.iter().map(String::as_str).collect();
            parts.push(format!("one of {{{}}}", values.join(", ")));
        }
        StringsAllowed::Set(_) => {}
    }
    if data_type.is_nullable() {
        parts.push("nullable".to_string());
    }
    if parts.is_empty() {
        "nothing".to_string()
    } else {
        parts.join(" | ")
    }
}

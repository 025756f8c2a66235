//! Integration tests for ticdat.

use std::fs;

use indexmap::IndexMap;
use tempfile::TempDir;

use ticdat::input::{write_directory, write_json_file};
use ticdat::{
    Builder, CsvDirectory, DataType, InfinityIoFlag, IntegrityChecker, JsonFile, Key,
    MemorySource, RawTable, RowRef, Schema, SchemaDefinition, TicDatError, Value, row,
};

fn diet_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_table("categories", ["Name"], ["Min", "Max"])
        .expect("categories");
    schema.add_table("foods", ["Name"], ["Cost"]).expect("foods");
    schema
        .add_table("nutrition", ["Food", "Category"], ["Quantity"])
        .expect("nutrition");
    schema
        .set_data_type("categories", "Min", DataType::number())
        .unwrap();
    schema
        .set_data_type(
            "categories",
            "Max",
            DataType::number().with_max(f64::INFINITY, true).unwrap(),
        )
        .unwrap();
    schema
        .set_data_type("foods", "Cost", DataType::number())
        .unwrap();
    schema
        .add_foreign_key("nutrition", "foods", &[("Food", "Name")])
        .unwrap();
    schema
        .add_foreign_key("nutrition", "categories", &[("Category", "Name")])
        .unwrap();
    schema
}

fn diet_source() -> MemorySource {
    MemorySource::new()
        .with_table(
            "categories",
            RawTable::positional([
                vec![Value::from("protein"), Value::from(91), Value::Float(f64::INFINITY)],
                vec![Value::from("fat"), Value::from(0), Value::from(65)],
            ]),
        )
        .with_table(
            "foods",
            RawTable::positional([vec![Value::from("burger"), Value::from(2.49)]]),
        )
}

// =============================================================================
// Diet Scenario
// =============================================================================

#[test]
fn test_diet_data_types() {
    let schema = diet_schema();
    let mut dat = Builder::new(&schema).build(&diet_source()).expect("build");
    let checker = IntegrityChecker::new(&schema);
    assert!(checker.find_data_type_failures(&dat).is_empty());
    assert!(dat.table("nutrition").unwrap().is_empty());

    dat.set_field("categories", "fat", "Max", -5).unwrap();
    let failures = checker.find_data_type_failures(&dat);
    assert_eq!(failures.len(), 1);
    let max = &failures["categories"]["Max"];
    assert_eq!(max.rows, vec![RowRef::Key(Key::from("fat"))]);
    assert!(max.bad_values.contains(&Value::Int(-5)));
}

#[test]
fn test_diet_check_report() {
    let schema = diet_schema();
    let source = diet_source().with_table(
        "nutrition",
        RawTable::positional([
            vec![Value::from("burger"), Value::from("protein"), Value::from(32)],
            vec![Value::from("fries"), Value::from("fat"), Value::from(19)],
        ]),
    );
    let dat = Builder::new(&schema).build(&source).unwrap();
    let report = IntegrityChecker::new(&schema).check(&dat);
    assert!(!report.is_clean());
    let failure = &report.foreign_keys["nutrition(Food)->foods(Name)"];
    assert_eq!(failure.rows, vec![RowRef::Key(Key::from(("fries", "fat")))]);
    assert_eq!(report.findings().len(), 1);
}

// =============================================================================
// Foreign Keys
// =============================================================================

#[test]
fn test_parent_child_foreign_key() {
    let mut schema = Schema::new();
    schema.add_table("parent", ["id"], Vec::<String>::new()).unwrap();
    schema.add_table("child", ["id"], Vec::<String>::new()).unwrap();
    schema
        .add_named_foreign_key("child_fk", "child", "parent", &[("id", "id")])
        .unwrap();
    let source = MemorySource::new()
        .with_table("parent", RawTable::positional([vec!["a"], vec!["b"]]))
        .with_table("child", RawTable::positional([vec!["a"], vec!["c"]]));
    let dat = Builder::new(&schema).build(&source).unwrap();

    let failures = IntegrityChecker::new(&schema).find_foreign_key_failures(&dat);
    let json = serde_json::to_value(&failures).unwrap();
    assert_eq!(json["child_fk"]["values"], serde_json::json!(["c"]));
    assert_eq!(json["child_fk"]["cardinality"], "one-to-one");
}

// =============================================================================
// Duplicates and Frozen Collections
// =============================================================================

#[test]
fn test_duplicates_last_write_wins() {
    let schema = diet_schema();
    let source = MemorySource::new().with_table(
        "foods",
        RawTable::positional([
            vec![Value::from("burger"), Value::from(2.49)],
            vec![Value::from("fries"), Value::from(1.89)],
            vec![Value::from("burger"), Value::from(3.0)],
        ]),
    );
    let outcome = Builder::new(&schema).build_report(&source).unwrap();
    assert_eq!(
        outcome.dat.get("foods", "burger").unwrap()["Cost"],
        Value::Float(3.0)
    );
    assert_eq!(outcome.duplicates.count("foods", "burger"), Some(2));
    assert_eq!(outcome.duplicates.count("foods", "fries"), None);
}

#[test]
fn test_frozen_collection() {
    let schema = diet_schema();
    let mut dat = Builder::new(&schema)
        .build_frozen(&diet_source())
        .unwrap();
    assert!(dat.is_frozen());
    assert!(matches!(
        dat.insert("foods", "salad", row([("Cost", 4.0)])),
        Err(TicDatError::Frozen { .. })
    ));
    assert!(matches!(
        dat.remove("foods", "burger"),
        Err(TicDatError::Frozen { .. })
    ));
    assert_eq!(dat.table("foods").unwrap().len(), 1);

    let copy = dat.clone();
    assert!(copy.is_frozen());
    assert!(schema.good_tic_dat(&copy).is_ok());
}

// =============================================================================
// Adapters
// =============================================================================

#[test]
fn test_csv_round_trip() {
    let mut schema = diet_schema();
    schema
        .set_infinity_io_flag(InfinityIoFlag::Sentinel(999_999_999.0))
        .unwrap();
    let dat = Builder::new(&schema).build(&diet_source()).unwrap();

    let dir = TempDir::new().unwrap();
    write_directory(&schema, &dat, dir.path(), false).unwrap();
    let text = fs::read_to_string(dir.path().join("categories.csv")).unwrap();
    assert!(text.contains("protein,91,999999999"));

    let outcome = Builder::new(&schema)
        .build_report(&CsvDirectory::new(dir.path()).unwrap())
        .unwrap();
    assert!(outcome.dat.same_data(&dat));
    assert!(outcome.sources["foods"].hash.starts_with("sha256:"));
    assert_eq!(
        outcome.dat.get("categories", "protein").unwrap()["Max"],
        Value::Float(f64::INFINITY)
    );
}

#[test]
fn test_csv_missing_field_is_an_error() {
    let schema = diet_schema();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("foods.csv"), "Name\nburger\n").unwrap();
    let result = Builder::new(&schema).build(&CsvDirectory::new(dir.path()).unwrap());
    assert!(matches!(result, Err(TicDatError::Construction { .. })));
}

#[test]
fn test_json_round_trip() {
    let schema = diet_schema();
    let dat = Builder::new(&schema).build(&diet_source()).unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("diet.json");
    write_json_file(&schema, &dat, &path, false).unwrap();
    assert!(write_json_file(&schema, &dat, &path, false).is_err());

    let again = Builder::new(&schema)
        .build(&JsonFile::open(&path).unwrap())
        .unwrap();
    assert!(again.same_data(&dat));
}

#[test]
fn test_csv_and_json_agree() {
    let schema = diet_schema();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("categories.csv"),
        "name,min,max\nprotein,91,inf\nfat,0,65\n",
    )
    .unwrap();
    let from_csv = Builder::new(&schema)
        .build(&CsvDirectory::new(dir.path()).unwrap())
        .unwrap();
    let from_json = Builder::new(&schema)
        .build(
            &JsonFile::parse(
                r#"{"categories": [{"Name": "protein", "Min": 91, "Max": "inf"},
                                   {"Name": "fat", "Min": 0, "Max": 65.0}]}"#,
            )
            .unwrap(),
        )
        .unwrap();
    assert!(from_csv.same_data(&from_json));
}

// =============================================================================
// Schema Documents
// =============================================================================

#[test]
fn test_schema_document_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.json");
    let definition: SchemaDefinition = diet_schema().to_definition();
    fs::write(&path, serde_json::to_string_pretty(&definition).unwrap()).unwrap();

    let loaded = Schema::load(&path).unwrap();
    assert_eq!(loaded.to_definition(), definition);
    assert!(
        loaded
            .data_type("categories", "Max")
            .unwrap()
            .allows_positive_infinity()
    );
}

#[test]
fn test_empty_string_as_null_setting() {
    let mut schema = Schema::new();
    schema.add_table("notes", ["id"], ["text"]).unwrap();
    schema
        .set_data_type("notes", "text", DataType::any_string().nullable())
        .unwrap();
    let mut record = IndexMap::new();
    record.insert("id".to_string(), Value::from("a"));
    record.insert("text".to_string(), Value::from(""));
    let source = MemorySource::new().with_table("notes", RawTable::from_records(vec![record]).textual());

    let dat = Builder::new(&schema).build(&source).unwrap();
    assert_eq!(dat.get("notes", "a").unwrap()["text"], Value::Null);

    schema.set_empty_string_as_null(false);
    let dat = Builder::new(&schema).build(&source).unwrap();
    assert_eq!(dat.get("notes", "a").unwrap()["text"], Value::from(""));
}

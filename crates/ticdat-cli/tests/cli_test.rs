//! End-to-end tests for the ticdat binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const SCHEMA: &str = r#"{
  "tables": {
    "categories": {"primary_key": ["Name"], "data": ["Min", "Max"]},
    "foods": {"primary_key": ["Name"], "data": ["Cost"]},
    "nutrition": {"primary_key": ["Food", "Category"], "data": ["Quantity"]}
  },
  "foreign_keys": [
    {"native_table": "nutrition", "foreign_table": "foods",
     "mappings": [{"native": "Food", "foreign": "Name"}]},
    {"native_table": "nutrition", "foreign_table": "categories",
     "mappings": [{"native": "Category", "foreign": "Name"}]}
  ],
  "data_types": {
    "categories": {"Max": {"max": "inf", "inclusive_max": true}},
    "foods": {"Cost": {}}
  }
}"#;

fn ticdat(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ticdat"))
        .args(args)
        .output()
        .expect("run ticdat")
}

fn setup(dir: &Path) {
    fs::write(dir.join("schema.json"), SCHEMA).unwrap();
    let data = dir.join("diet");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("categories.csv"), "Name,Min,Max\nprotein,91,inf\nfat,0,65\n").unwrap();
    fs::write(data.join("foods.csv"), "Name,Cost\nburger,2.49\nfries,-1\n").unwrap();
    fs::write(
        data.join("nutrition.csv"),
        "Food,Category,Quantity\nburger,protein,32\nsalad,fat,1\n",
    )
    .unwrap();
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_check_reports_findings_as_json() {
    let dir = TempDir::new().unwrap();
    setup(dir.path());
    let schema = dir.path().join("schema.json");
    let data = dir.path().join("diet");

    let output = ticdat(&["check", "--json", path_str(&schema), path_str(&data)]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["clean"], false);
    assert_eq!(report["rows"]["foods"], 2);
    assert_eq!(report["findings"].as_array().unwrap().len(), 2);
    assert!(report["report"]["data_types"]["foods"]["Cost"].is_object());

    let strict = ticdat(&["check", "--strict", path_str(&schema), path_str(&data)]);
    assert!(!strict.status.success());
    assert!(String::from_utf8_lossy(&strict.stderr).contains("Error:"));
}

#[test]
fn test_convert_csv_to_json_and_back() {
    let dir = TempDir::new().unwrap();
    setup(dir.path());
    let schema = dir.path().join("schema.json");
    let data = dir.path().join("diet");
    let json = dir.path().join("diet.json");

    let output = ticdat(&[
        "convert",
        path_str(&schema),
        path_str(&data),
        path_str(&json),
        "--drop-orphans",
    ]);
    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(document["nutrition"].as_array().unwrap().len(), 1);

    let again = ticdat(&["convert", path_str(&schema), path_str(&data), path_str(&json)]);
    assert!(!again.status.success());

    let back = dir.path().join("back");
    let output = ticdat(&["convert", path_str(&schema), path_str(&json), path_str(&back)]);
    assert!(output.status.success());
    let nutrition = fs::read_to_string(back.join("nutrition.csv")).unwrap();
    assert!(nutrition.starts_with("Food,Category,Quantity"));
    assert!(!nutrition.contains("salad"));
}

#[test]
fn test_describe_schema() {
    let dir = TempDir::new().unwrap();
    setup(dir.path());
    let schema = dir.path().join("schema.json");

    let output = ticdat(&["describe", "--json", path_str(&schema)]);
    assert!(output.status.success());
    let described: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let fks = described["foreign_keys"].as_array().unwrap();
    assert_eq!(fks.len(), 2);
    assert_eq!(fks[0]["cardinality"], "many-to-one");

    let missing = ticdat(&["describe", path_str(&dir.path().join("nope.json"))]);
    assert!(!missing.status.success());
}

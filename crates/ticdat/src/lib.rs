//! TicDat: schema-driven validation and normalization of relational table data.
//!
//! A [`Schema`] declares tables, primary keys, data fields, per-field data
//! types, defaults and foreign keys. The [`Builder`] turns raw rows from any
//! [`TableSource`] into a [`TicDat`] collection, normalizing cells on the way,
//! and the [`IntegrityChecker`] reports what the data gets wrong without
//! ever failing on bad data.
//!
//! # Core Principles
//!
//! - **Advisory checks**: validation findings are returned as data
//! - **Format-neutral values**: every adapter yields the same normalized cells
//! - **Per-schema settings**: the infinity flag lives on the schema instance
//!
//! # Example
//!
//! ```
//! use ticdat::{Builder, DataType, IntegrityChecker, MemorySource, RawTable, Schema, Value};
//!
//! let mut schema = Schema::new();
//! schema.add_table("foods", ["Name"], ["Cost"]).unwrap();
//! schema.set_data_type("foods", "Cost", DataType::number()).unwrap();
//!
//! let source = MemorySource::new()
//!     .with_table("foods", RawTable::positional([vec![Value::from("burger"), Value::from(2.49)]]));
//! let dat: ticdat::TicDat = Builder::new(&schema).build(&source).unwrap();
//!
//! let report = IntegrityChecker::new(&schema).check(&dat);
//! assert!(report.is_clean());
//! ```

pub mod builder;
pub mod dat;
pub mod error;
pub mod input;
pub mod integrity;
pub mod normalize;
pub mod schema;
pub mod solver;
pub mod value;

pub use builder::{BuildOutcome, Builder};
pub use dat::{Row, RowRef, Table, TicDat, row};
pub use error::{Result, TicDatError};
pub use input::{CsvDirectory, JsonFile, MemorySource, RawRows, RawTable, SourceMetadata, TableSource};
pub use integrity::{DuplicateReport, Finding, IntegrityChecker, IntegrityReport, Severity};
pub use normalize::{InfinityIoFlag, Normalizer, ReadOptions};
pub use schema::{Cardinality, DataType, ForeignKey, Schema, SchemaDefinition, TableSpec};
pub use value::{Key, Value};

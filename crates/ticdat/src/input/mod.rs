//! Adapters that hand raw rows to the builder, and write collections back.

mod delimited;
mod json;
mod source;

pub use delimited::{CsvDirectory, write_directory};
pub use json::{JsonFile, to_json_value, write_json_file};
pub use source::{MemorySource, RawRows, RawTable, SourceMetadata, TableSource, content_hash};

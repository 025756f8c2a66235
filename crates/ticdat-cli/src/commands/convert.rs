//! Convert command - rewrite a data set in another format.

use std::path::PathBuf;

use colored::Colorize;
use ticdat::input::{write_directory, write_json_file};
use ticdat::{Builder, IntegrityChecker, Schema};
use tracing::warn;

use super::{is_json_path, open_data};

pub fn run(
    schema_path: PathBuf,
    input: PathBuf,
    output: PathBuf,
    delimiter: Option<char>,
    drop_orphans: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Schema::load(&schema_path)?;
    let source = open_data(&input, delimiter)?;
    let outcome = Builder::new(&schema).build_report(source.as_ref())?;
    let mut dat = outcome.dat;

    for (table, counts) in outcome.duplicates.iter() {
        warn!(table = %table, keys = counts.len(), "repeated primary keys, keeping the last row");
    }

    if drop_orphans {
        let removed = IntegrityChecker::new(&schema).remove_foreign_key_failures(&mut dat)?;
        if removed > 0 {
            println!(
                "Dropped {} rows with unmatched foreign keys",
                removed.to_string().yellow()
            );
        }
    }

    if is_json_path(&output) {
        write_json_file(&schema, &dat, &output, force)?;
    } else {
        write_directory(&schema, &dat, &output, force)?;
    }

    let rows: usize = dat.tables().map(|(_, t)| t.len()).sum();
    println!(
        "{} {} rows to {}",
        "Wrote".green().bold(),
        rows,
        output.display().to_string().white()
    );
    Ok(())
}

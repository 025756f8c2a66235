//! Check command - build a data set and report integrity findings.

use std::path::PathBuf;

use colored::Colorize;
use ticdat::{Builder, IntegrityChecker, ReadOptions, Schema, Severity};
use tracing::info;

use super::open_data;

pub fn run(
    schema_path: PathBuf,
    data: PathBuf,
    delimiter: Option<char>,
    literal_inf: bool,
    json_output: bool,
    strict: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = Schema::load(&schema_path)?;
    let source = open_data(&data, delimiter)?;

    let options = ReadOptions {
        treat_inf_as_infinity: !literal_inf,
    };
    let outcome = Builder::new(&schema)
        .with_options(options)
        .build_report(source.as_ref())?;
    info!(tables = outcome.dat.table_names().count(), "built data set");

    let mut report = IntegrityChecker::new(&schema).check(&outcome.dat);
    report.duplicates = outcome.duplicates;
    let findings = report.findings();

    if json_output {
        let output = serde_json::json!({
            "data": data.display().to_string(),
            "clean": report.is_clean(),
            "sources": outcome.sources,
            "rows": outcome
                .dat
                .tables()
                .map(|(name, table)| (name.to_string(), table.len()))
                .collect::<std::collections::BTreeMap<_, _>>(),
            "findings": findings,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {}", "Checking".cyan().bold(), data.display().to_string().white());
        println!();

        println!("{}", "Tables:".yellow().bold());
        for (name, table) in outcome.dat.tables() {
            let origin = outcome
                .sources
                .get(name)
                .map(|s| format!(" ({})", s.file))
                .unwrap_or_default();
            println!("  {:<24} {:>8} rows{}", name, table.len(), origin.dimmed());
        }
        println!();

        if findings.is_empty() {
            println!("{}", "No integrity problems found.".green().bold());
        } else {
            println!("{}", "Findings:".yellow().bold());
            for finding in &findings {
                let line = finding.to_string();
                match finding.severity {
                    Severity::Error => println!("  {}", line.red()),
                    Severity::Warning => println!("  {}", line.yellow()),
                }
            }
            println!();
            let errors = findings
                .iter()
                .filter(|f| f.severity == Severity::Error)
                .count();
            println!(
                "{} errors, {} warnings",
                errors.to_string().red().bold(),
                (findings.len() - errors).to_string().yellow().bold()
            );
        }
    }

    if strict && !report.is_clean() {
        return Err(format!("{} integrity findings", findings.len()).into());
    }
    Ok(())
}

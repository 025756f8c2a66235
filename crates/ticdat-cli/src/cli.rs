//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TicDat: check and convert schema-driven table data
#[derive(Parser)]
#[command(name = "ticdat")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a data set and report its integrity problems
    Check {
        /// Path to the schema document (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Data set: a directory of CSV files or a JSON file
        #[arg(value_name = "DATA")]
        data: PathBuf,

        /// Field delimiter for CSV files (detected when omitted)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Read the text "inf" literally instead of as infinity
        #[arg(long)]
        literal_inf: bool,

        /// Output report as JSON
        #[arg(long)]
        json: bool,

        /// Exit with an error when any finding is reported
        #[arg(long)]
        strict: bool,
    },

    /// Convert a data set between a CSV directory and a JSON file
    Convert {
        /// Path to the schema document (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Input data set: a directory of CSV files or a JSON file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output data set: a `.json` file, otherwise a CSV directory
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Field delimiter for CSV input (detected when omitted)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Drop rows whose foreign keys have no match before writing
        #[arg(long)]
        drop_orphans: bool,

        /// Replace existing output files
        #[arg(short, long)]
        force: bool,
    },

    /// Summarize a schema document
    Describe {
        /// Path to the schema document (JSON)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

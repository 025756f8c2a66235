//! TicDat CLI - check and convert schema-driven table data.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(&logging::LogConfig::from_verbosity(cli.verbose)) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let result = match cli.command {
        Commands::Check {
            schema,
            data,
            delimiter,
            literal_inf,
            json,
            strict,
        } => commands::check::run(schema, data, delimiter, literal_inf, json, strict),

        Commands::Convert {
            schema,
            input,
            output,
            delimiter,
            drop_orphans,
            force,
        } => commands::convert::run(schema, input, output, delimiter, drop_orphans, force),

        Commands::Describe { schema, json } => commands::describe::run(schema, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

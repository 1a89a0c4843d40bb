use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use opstools::{logging::init_logging, schema::validate_files};

/// Validate a JSON file against a given schema.
///
/// Exits 0 when the data is valid, 1 when it fails validation, and 2 when
/// either input can't be used (missing file, invalid JSON, no schema, or a
/// schema that isn't itself a valid JSON schema).
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to the JSON configuration file.
    json_file: PathBuf,

    /// Path to the JSON schema file (optional if a schema string is provided).
    schema_file: Option<PathBuf>,

    /// Schema as a JSON string (instead of a file).  Takes precedence over
    /// the schema file.
    #[arg(long)]
    schema: Option<String>,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match validate_files(
        &args.json_file,
        args.schema.as_deref(),
        args.schema_file.as_deref(),
    ) {
        Ok(report) => {
            print!("{}", report.render());
            ExitCode::from(report.exit_code())
        }
        Err(err) => {
            println!("Error: {}", err);
            ExitCode::from(2)
        }
    }
}

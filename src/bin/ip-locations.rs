use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, ValueEnum};
use serde_json::{to_string, to_string_pretty};

use opstools::{
    geo::{
        aggregate, make_ipinfo_resolver, parse_identifier_list, resolve_all, AggregateOptions,
        DEFAULT_IPINFO_URL, KEY_SEPARATOR, UNKNOWN_PLACEHOLDER,
    },
    logging::init_logging,
};

#[derive(Clone, Debug, PartialEq, ValueEnum)]
enum OutputFormat {
    /// Pretty-printed JSON array.
    Pretty,
    /// Single-line JSON array.
    Concise,
    /// One location per line.
    Lines,
}

/// Look up where a list of IP addresses live and print the distinct
/// "country, region, city" locations they come from, sorted.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// IP addresses to locate.
    ips: Vec<String>,

    /// File with more IP addresses, one per line; `#` starts a comment.
    #[arg(long)]
    ips_file: Option<PathBuf>,

    /// Base URL of the ipinfo-compatible lookup service.
    #[arg(long, env = "IPINFO_URL", default_value = DEFAULT_IPINFO_URL)]
    ipinfo_url: String,

    /// Filed in place of any location level the lookup didn't return.
    #[arg(long, default_value = UNKNOWN_PLACEHOLDER)]
    placeholder: String,

    #[arg(long, default_value = KEY_SEPARATOR)]
    separator: String,

    #[arg(long, short, value_enum, ignore_case = true, default_value = "pretty")]
    output_format: OutputFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let mut ips = args.ips.clone();
    if let Some(path) = &args.ips_file {
        match std::fs::read_to_string(path) {
            Ok(text) => ips.extend(parse_identifier_list(&text)),
            Err(err) => {
                eprintln!("Error: Problem reading '{}': {}", path.display(), err);
                return ExitCode::from(2);
            }
        }
    }
    if ips.is_empty() {
        eprintln!("Error: No IP addresses given.");
        return ExitCode::from(2);
    }

    let resolver = match make_ipinfo_resolver(&args.ipinfo_url) {
        Ok(resolver) => resolver,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::from(2);
        }
    };

    let records = resolve_all(&resolver, &ips).await;
    let options = AggregateOptions {
        placeholder: args.placeholder,
        separator: args.separator,
    };
    let locations: Vec<String> = aggregate(&records, &options).into_iter().collect();

    match format_locations(&args.output_format, &locations) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: Problem serializing locations: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn format_locations(format: &OutputFormat, locations: &[String]) -> serde_json::Result<String> {
    match format {
        OutputFormat::Lines => Ok(locations.join("\n")),
        OutputFormat::Pretty => to_string_pretty(locations),
        OutputFormat::Concise => to_string(locations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Vec<String> {
        vec![
            "NL, North Holland, Amsterdam".to_string(),
            "Unknown, Unknown, Unknown".to_string(),
        ]
    }

    #[test]
    fn every_format_renders() {
        assert_eq!(
            format_locations(&OutputFormat::Lines, &locations()).unwrap(),
            "NL, North Holland, Amsterdam\nUnknown, Unknown, Unknown"
        );
        assert_eq!(
            format_locations(&OutputFormat::Concise, &locations()).unwrap(),
            r#"["NL, North Holland, Amsterdam","Unknown, Unknown, Unknown"]"#
        );
        let pretty = format_locations(&OutputFormat::Pretty, &locations()).unwrap();
        insta::assert_snapshot!(pretty, @r###"
        [
          "NL, North Holland, Amsterdam",
          "Unknown, Unknown, Unknown"
        ]
        "###);
    }
}

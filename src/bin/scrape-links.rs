use std::process::ExitCode;

use clap::Parser;
use url::Url;

use opstools::{
    logging::init_logging,
    scrape::{extract_attribute, fetch_page, DEFAULT_SCRAPE_SELECTOR, DEFAULT_SCRAPE_URL},
};

/// Fetch a page and print an attribute of every element matching a CSS
/// selector as a JSON array.  By default this lists the article links of
/// Wikipedia's municipalities-of-Brazil table.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, default_value = DEFAULT_SCRAPE_URL)]
    url: Url,

    #[arg(long, default_value = DEFAULT_SCRAPE_SELECTOR)]
    selector: String,

    #[arg(long, default_value = "href")]
    attribute: String,

    /// Print one value per line instead of a JSON array.
    #[arg(long)]
    lines: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let html = match fetch_page(args.url.clone()).await {
        Ok(html) => html,
        Err(err) => {
            eprintln!("Error: Problem fetching {}: {}", args.url, err);
            return ExitCode::FAILURE;
        }
    };

    let values = match extract_attribute(&html, &args.selector, &args.attribute) {
        Ok(values) => values,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    if args.lines {
        for value in &values {
            println!("{}", value);
        }
    } else {
        println!("{}", serde_json::Value::from(values));
    }

    ExitCode::SUCCESS
}

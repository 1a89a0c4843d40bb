use lol_html::{element, HtmlRewriter, Selector, Settings};
use url::Url;

use crate::errors::{ErrorLayer, Result, ToolError};

pub const DEFAULT_SCRAPE_URL: &str =
    "https://en.wikipedia.org/wiki/List_of_municipalities_of_Brazil";
pub const DEFAULT_SCRAPE_SELECTOR: &str =
    "#mw-content-text > div.mw-parser-output > table > tbody > tr > td > a";

pub async fn fetch_page(url: Url) -> Result<String> {
    trace!(%url, "fetching page");
    let res = reqwest::get(url).await?;

    if !res.status().is_success() {
        let message = format!("Server status of {}", res.status());
        if res.status().is_server_error() {
            return Err(ToolError::transient(ErrorLayer::ExternalLayer, message));
        }
        return Err(ToolError::sticky(ErrorLayer::ExternalLayer, message));
    }

    Ok(res.text().await?)
}

/// Collect `attribute` from every element matching the CSS `selector`, in
/// document order.  Matching elements without the attribute are skipped.
pub fn extract_attribute(html: &str, selector: &str, attribute: &str) -> Result<Vec<String>> {
    // The `element!` macro unwraps the selector parse, so vet it first.
    if let Err(err) = selector.parse::<Selector>() {
        return Err(ToolError::sticky(
            ErrorLayer::BadInput,
            format!("Bad CSS selector '{}': {}", selector, err),
        ));
    }

    let mut values = vec![];
    let mut missing = 0usize;

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!(selector, |el| {
                match el.get_attribute(attribute) {
                    Some(value) => values.push(value),
                    None => missing += 1,
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |_: &[u8]| {},
    );

    rewriter.write(html.as_bytes()).map_err(rewrite_error)?;
    rewriter.end().map_err(rewrite_error)?;

    if missing > 0 {
        trace!(missing, attribute, "matched elements without the attribute");
    }

    Ok(values)
}

fn rewrite_error<E: std::fmt::Display>(err: E) -> ToolError {
    ToolError::sticky(
        ErrorLayer::BadInput,
        format!("Problem parsing HTML: {}", err),
    )
}

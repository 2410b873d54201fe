//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - Raw link references in document order
//! - The effective base URL (`<base href>` aware)
//! - Page title, for logging
//!
//! Nothing here canonicalizes or filters by domain. Out-of-domain targets
//! must still reach the coordinator so they are recorded as edges.

use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// URL relative references on this page resolve against
    pub base: Url,

    /// Raw href values in document order, unresolved and unfiltered
    pub links: Vec<String>,
}

/// Parses HTML content and extracts links and metadata
///
/// # Link Sources
///
/// - `<a href="...">`
/// - `<area href="...">`
///
/// The first `<base href>` element overrides `page_url` as resolution base;
/// it is itself resolved against `page_url`. An unusable `<base>` is ignored.
///
/// Parsing is lenient: malformed markup yields whatever links the HTML5
/// parser recovers, possibly none, and never an error.
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL the content was served from (after redirects)
///
/// # Example
///
/// ```
/// use sitegraph::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &page_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["/page".to_string()]);
/// ```
pub fn parse_html(html: &str, page_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        base: document_base(&document, page_url),
        links: collect_hrefs(&document),
    }
}

/// Yields the resolution base and the raw href references in `html`
///
/// The base follows the same `<base href>` rule as [`parse_html`]. References
/// come in document order, and re-parsing the same content always yields the
/// same sequence.
pub fn extract_links(html: &str, page_url: &Url) -> (Url, Vec<String>) {
    let document = Html::parse_document(html);
    (document_base(&document, page_url), collect_hrefs(&document))
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn document_base(document: &Html, page_url: &Url) -> Url {
    let Ok(selector) = Selector::parse("base[href]") else {
        return page_url.clone();
    };

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .and_then(|href| page_url.join(href).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

fn collect_hrefs(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href], area[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

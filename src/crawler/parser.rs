//! HTML parser for extracting page content
//!
//! This module handles parsing HTML content to extract:
//! - Page title and meta description
//! - Headings (h1–h6) and paragraphs in document order
//! - Links with visible text that stay on the crawl domain
//! - Image references to be downloaded by the extractor
//!
//! Parsing is synchronous and never fails: html5ever recovers from malformed
//! markup and missing elements default to empty values.

use crate::state::{Heading, HeadingLevel};
use crate::url::normalize;
use crate::CrawlError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// CSS selectors used during extraction, compiled once per crawl
#[derive(Debug)]
pub struct Selectors {
    title: Selector,
    meta_description: Selector,
    headings: Selector,
    paragraphs: Selector,
    anchors: Selector,
    images: Selector,
}

impl Selectors {
    /// Compiles every selector
    ///
    /// # Returns
    ///
    /// * `Ok(Selectors)` - All selectors compiled
    /// * `Err(CrawlError::Selector)` - A selector failed to compile
    pub fn new() -> Result<Self, CrawlError> {
        Ok(Self {
            title: compile("title")?,
            meta_description: compile(r#"meta[name="description"]"#)?,
            headings: compile("h1, h2, h3, h4, h5, h6")?,
            paragraphs: compile("p")?,
            anchors: compile("a")?,
            images: compile("img")?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// A link whose target passed normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLink {
    pub text: String,
    pub url: Url,
}

/// An `<img>` whose source passed normalization, not yet downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub src: Url,
    pub alt: String,
}

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: String,
    pub meta_description: String,
    pub headings: Vec<Heading>,
    pub paragraphs: Vec<String>,
    pub links: Vec<ParsedLink>,
    pub images: Vec<ImageRef>,
}

/// Parses HTML content and extracts the page record
///
/// # Extraction Rules
///
/// - Title: text of the first `<title>`, empty if absent
/// - Meta description: `content` of `<meta name="description">`, empty if absent
/// - Headings and paragraphs: elements with non-empty text only
/// - Links: `<a>` elements need both a normalizable `href` and visible text;
///   icon-only anchors are dropped
/// - Images: `<img>` elements with a normalizable `src`
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The URL of the page, used to resolve relative references
/// * `base_domain` - Host that links and images must share
/// * `selectors` - Precompiled selectors
///
/// # Example
///
/// ```
/// use site_harvest::crawler::{parse_page, Selectors};
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &page_url, "example.com", &Selectors::new().unwrap());
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links[0].url.as_str(), "https://example.com/page");
/// ```
pub fn parse_page(html: &str, page_url: &Url, base_domain: &str, selectors: &Selectors) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document, selectors),
        meta_description: extract_meta_description(&document, selectors),
        headings: extract_headings(&document, selectors),
        paragraphs: extract_paragraphs(&document, selectors),
        links: extract_links(&document, page_url, base_domain, selectors),
        images: extract_images(&document, page_url, base_domain, selectors),
    }
}

/// Concatenates an element's text nodes and collapses whitespace runs
fn element_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_title(document: &Html, selectors: &Selectors) -> String {
    document
        .select(&selectors.title)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn extract_meta_description(document: &Html, selectors: &Selectors) -> String {
    document
        .select(&selectors.meta_description)
        .next()
        .and_then(|element| element.value().attr("content"))
        .unwrap_or_default()
        .to_string()
}

fn extract_headings(document: &Html, selectors: &Selectors) -> Vec<Heading> {
    document
        .select(&selectors.headings)
        .filter_map(|element| {
            let level = HeadingLevel::from_tag(element.value().name())?;
            let text = element_text(element);
            (!text.is_empty()).then_some(Heading { level, text })
        })
        .collect()
}

fn extract_paragraphs(document: &Html, selectors: &Selectors) -> Vec<String> {
    document
        .select(&selectors.paragraphs)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn extract_links(
    document: &Html,
    page_url: &Url,
    base_domain: &str,
    selectors: &Selectors,
) -> Vec<ParsedLink> {
    document
        .select(&selectors.anchors)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = normalize(href, page_url, base_domain)?;
            let text = element_text(element);
            (!text.is_empty()).then_some(ParsedLink { text, url })
        })
        .collect()
}

fn extract_images(
    document: &Html,
    page_url: &Url,
    base_domain: &str,
    selectors: &Selectors,
) -> Vec<ImageRef> {
    document
        .select(&selectors.images)
        .filter_map(|element| {
            let src = element.value().attr("src")?;
            let src = normalize(src, page_url, base_domain)?;
            let alt = element.value().attr("alt").unwrap_or_default().to_string();
            Some(ImageRef { src, alt })
        })
        .collect()
}

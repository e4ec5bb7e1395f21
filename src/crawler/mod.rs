//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with identity rotation
//! - HTML parsing and content extraction
//! - Image downloading
//! - Breadth-first crawl scheduling

mod extractor;
mod fetcher;
mod parser;
mod scheduler;

pub use extractor::Extractor;
pub use fetcher::{build_http_client, select_identity, Fetcher, BROWSER_IDENTITIES};
pub use parser::{parse_page, ImageRef, ParsedLink, ParsedPage, Selectors};
pub use scheduler::{CancelFlag, Crawler};

use crate::config::Config;
use crate::state::CrawlResults;
use crate::CrawlError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and selectors
/// 2. Validate the seed URL
/// 3. Fetch and extract pages breadth-first on the seed's host
/// 4. Return the accumulated results
///
/// # Arguments
///
/// * `seed_url` - The URL to start from
/// * `config` - The crawler configuration
/// * `on_progress` - Called with (pages processed, current URL) after each page
///
/// # Returns
///
/// * `Ok(CrawlResults)` - Crawl completed
/// * `Err(CrawlError)` - Invalid seed or client setup failure
pub async fn crawl<F>(seed_url: &str, config: &Config, on_progress: F) -> Result<CrawlResults, CrawlError>
where
    F: FnMut(usize, &str),
{
    Crawler::new(config)?.crawl(seed_url, on_progress).await
}

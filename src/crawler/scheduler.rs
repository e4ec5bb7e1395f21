//! Crawl scheduler - breadth-first traversal of a single site
//!
//! This module contains the main crawl loop:
//! - Validating the seed and deriving the base domain
//! - Draining the FIFO frontier one URL at a time
//! - Fetching, extracting and enqueueing newly discovered links
//! - Reporting progress after every processed URL
//! - Pausing a fixed delay between requests
//!
//! Per-URL failures are logged and recorded, never propagated. Only an invalid
//! seed stops a crawl before it starts.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::Fetcher;
use crate::state::{CrawlPhase, CrawlResults, CrawlState};
use crate::url::{extract_domain, is_valid_url, normalize};
use crate::CrawlError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Shared flag that asks a running crawl to stop
///
/// The flag is checked between frontier items, so the URL being processed
/// when it is set still completes.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Single-site crawler
///
/// One crawler runs one crawl at a time; each call to [`Crawler::crawl`]
/// starts from fresh state.
pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Fetcher,
    extractor: Extractor,
    cancel: CancelFlag,
}

impl Crawler {
    /// Creates a crawler from configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - HTTP client and selectors are ready
    /// * `Err(CrawlError)` - Failed to build the client or compile selectors
    pub fn new(config: &Config) -> Result<Self, CrawlError> {
        Ok(Self {
            config: config.crawler.clone(),
            fetcher: Fetcher::new(&config.fetch)?,
            extractor: Extractor::new(config.fetch.download_images)?,
            cancel: CancelFlag::new(),
        })
    }

    /// Replaces the cancellation flag
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that can stop this crawler from another task
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Crawls every reachable same-domain page from `seed_url`
    ///
    /// # Crawl Loop
    ///
    /// 1. Dequeue the next URL (FIFO); skip it if already visited
    /// 2. Mark it visited, then fetch it
    /// 3. On failure record it and move on; there are no retries
    /// 4. On success extract content and enqueue unvisited outbound links
    /// 5. Call `on_progress(processed, url)`
    /// 6. Sleep the configured delay before the next dequeue
    ///
    /// The loop ends when the frontier is empty, the page limit is reached or
    /// the cancel flag is set.
    ///
    /// # Arguments
    ///
    /// * `seed_url` - Absolute URL to start from; its host becomes the crawl domain
    /// * `on_progress` - Called after every processed URL, successful or not
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResults)` - Crawl finished (possibly early)
    /// * `Err(CrawlError::InvalidSeedUrl)` - The seed has no scheme or host, or is not HTTP(S)
    pub async fn crawl<F>(&mut self, seed_url: &str, mut on_progress: F) -> Result<CrawlResults, CrawlError>
    where
        F: FnMut(usize, &str),
    {
        let mut state = self.init(seed_url)?;
        state.transition(CrawlPhase::Running);

        tracing::info!("Starting crawl of {} from {}", state.base_domain(), seed_url);

        let delay = Duration::from_millis(self.config.request_delay_ms);
        let start_time = Instant::now();
        let mut stopped_early = false;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Crawl cancelled after {} pages", state.processed());
                stopped_early = true;
                break;
            }

            if let Some(max_pages) = self.config.max_pages {
                if state.processed() >= max_pages as usize {
                    tracing::info!("Page limit of {} reached", max_pages);
                    stopped_early = state.has_unvisited();
                    break;
                }
            }

            let url = match state.next_unvisited() {
                Some(url) => url,
                None => {
                    tracing::info!("Frontier is empty, crawl complete");
                    break;
                }
            };

            self.process_url(&mut state, &url).await;
            on_progress(state.processed(), url.as_str());

            if state.processed() % 10 == 0 {
                let rate = state.processed() as f64 / start_time.elapsed().as_secs_f64();
                tracing::info!(
                    "Progress: {} pages processed, {} in frontier, {:.2} pages/sec",
                    state.processed(),
                    state.frontier_len(),
                    rate
                );
            }

            if !delay.is_zero() && state.has_unvisited() {
                tokio::time::sleep(delay).await;
            }
        }

        let results = state.finish(stopped_early);

        tracing::info!(
            "Crawl finished: {} pages extracted, {} failed, in {:?}",
            results.page_count(),
            results.failures.len(),
            start_time.elapsed()
        );

        Ok(results)
    }

    /// Validates the seed and builds fresh crawl state
    fn init(&self, seed_url: &str) -> Result<CrawlState, CrawlError> {
        if !is_valid_url(seed_url) {
            return Err(CrawlError::InvalidSeedUrl(seed_url.to_string()));
        }

        let parsed = Url::parse(seed_url)
            .map_err(|e| CrawlError::InvalidSeedUrl(format!("{}: {}", seed_url, e)))?;
        let base_domain = extract_domain(&parsed)
            .ok_or_else(|| CrawlError::InvalidSeedUrl(seed_url.to_string()))?;

        // The seed goes through the same canonicalization as discovered links
        let seed = normalize(parsed.as_str(), &parsed, &base_domain)
            .ok_or_else(|| CrawlError::InvalidSeedUrl(seed_url.to_string()))?;

        Ok(CrawlState::new(seed, base_domain))
    }

    /// Fetches and extracts one URL, recording the outcome in `state`
    async fn process_url(&mut self, state: &mut CrawlState, url: &Url) {
        state.record_attempt(url);
        tracing::debug!("Processing URL: {}", url);

        let body = match self.fetcher.fetch(url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Error scraping {}: {}", url, e);
                state.record_failure(url, e.to_string());
                return;
            }
        };

        let (content, outbound) = self
            .extractor
            .extract(url, &body, state.base_domain(), &mut self.fetcher)
            .await;
        state.record_success(url, content);

        let mut enqueued = 0;
        for link in outbound {
            if state.enqueue(link) {
                enqueued += 1;
            }
        }
        tracing::debug!("Enqueued {} links from {}", enqueued, url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_crawler() -> Crawler {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        Crawler::new(&config).unwrap()
    }

    #[test]
    fn test_cancel_flag_shared_between_clones() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());

        handle.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_init_derives_base_domain() {
        let crawler = test_crawler();
        let state = crawler.init("https://Example.com/start#intro").unwrap();

        assert_eq!(state.base_domain(), "example.com");
        assert_eq!(state.phase(), CrawlPhase::Init);
        assert_eq!(state.frontier_len(), 1);
    }

    #[test]
    fn test_init_rejects_invalid_seeds() {
        let crawler = test_crawler();
        for seed in ["", "example.com", "/relative", "mailto:a@example.com", "ftp://example.com/"] {
            assert!(
                matches!(crawler.init(seed), Err(CrawlError::InvalidSeedUrl(_))),
                "{}",
                seed
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_seed_never_reports_progress() {
        let mut crawler = test_crawler();
        let mut calls = 0;

        let result = crawler.crawl("not a url", |_, _| calls += 1).await;

        assert!(matches!(result, Err(CrawlError::InvalidSeedUrl(_))));
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_returns_empty_results() {
        let mut crawler = test_crawler();
        crawler.cancel_flag().cancel();

        let results = crawler
            .crawl("http://127.0.0.1:9/", |_, _| {})
            .await
            .unwrap();

        assert!(results.cancelled);
        assert!(results.pages.is_empty());
        assert!(results.fetch_order.is_empty());
    }
}

//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client (cookies, compression, connect timeout)
//! - Rotating the client identity across a fixed pool of browser user agents
//! - GET requests for pages and images with per-kind timeouts
//! - Error classification
//!
//! The fetcher never retries. Every failure is returned to the caller, which
//! decides whether to skip the page or the image.

use crate::config::FetchConfig;
use crate::{FetchError, FetchResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONNECTION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

/// Browser identities rotated across requests
pub const BROWSER_IDENTITIES: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36 Edg/91.0.864.59",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Picks the identity for one request from the pool
///
/// This is a pure function of the random source, so a seeded RNG yields a
/// reproducible identity sequence.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use site_harvest::crawler::{select_identity, BROWSER_IDENTITIES};
///
/// let mut rng = StdRng::seed_from_u64(1);
/// let identity = select_identity(&mut rng);
/// assert!(BROWSER_IDENTITIES.contains(&identity));
/// ```
pub fn select_identity<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    BROWSER_IDENTITIES[rng.gen_range(0..BROWSER_IDENTITIES.len())]
}

/// Builds the shared HTTP client
///
/// Timeouts are applied per request, so only the connect timeout is set here.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page and image fetcher with identity rotation
pub struct Fetcher {
    client: Client,
    rng: StdRng,
    page_timeout: Duration,
    image_timeout: Duration,
}

impl Fetcher {
    /// Creates a fetcher from the fetch configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready to issue requests
    /// * `Err(reqwest::Error)` - Failed to build the HTTP client
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let rng = match config.identity_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            client: build_http_client()?,
            rng,
            page_timeout: Duration::from_millis(config.page_timeout_ms),
            image_timeout: Duration::from_millis(config.image_timeout_ms),
        })
    }

    /// Fetches a page body
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The decoded body of a 2xx response
    /// * `Err(FetchError)` - Non-2xx status, transport error or timeout
    pub async fn fetch(&mut self, url: &Url) -> FetchResult<String> {
        let response = self.send(url, self.page_timeout).await?;
        response.text().await.map_err(|e| classify_body_error(url, e))
    }

    /// Fetches raw image bytes
    ///
    /// Uses the shorter image timeout. Any failure is an error; the caller
    /// drops the image.
    pub async fn fetch_image(&mut self, url: &Url) -> FetchResult<Vec<u8>> {
        let response = self.send(url, self.image_timeout).await?;
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| classify_body_error(url, e))
    }

    fn request(&mut self, url: &Url, timeout: Duration) -> RequestBuilder {
        let identity = select_identity(&mut self.rng);

        self.client
            .get(url.as_str())
            .timeout(timeout)
            .header(USER_AGENT, identity)
            .header(ACCEPT, ACCEPT_VALUE)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(CONNECTION, "keep-alive")
    }

    async fn send(&mut self, url: &Url, timeout: Duration) -> FetchResult<Response> {
        let response = self
            .request(url, timeout)
            .send()
            .await
            .map_err(|e| classify_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn classify_request_error(url: &Url, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Connect { url }
    } else {
        FetchError::Request { url, source: error }
    }
}

fn classify_body_error(url: &Url, error: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else {
        FetchError::Body { url, source: error }
    }
}

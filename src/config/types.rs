use serde::Deserialize;

/// Main configuration structure for Site-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Crawl loop behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Fixed pause after every processed URL (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Stop after this many frontier items have been processed
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 500,
            max_pages: None,
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Timeout for page requests (milliseconds)
    #[serde(rename = "page-timeout-ms")]
    pub page_timeout_ms: u64,

    /// Timeout for image requests (milliseconds)
    #[serde(rename = "image-timeout-ms")]
    pub image_timeout_ms: u64,

    /// Whether `<img>` sources are downloaded and embedded
    #[serde(rename = "download-images")]
    pub download_images: bool,

    /// Seed for the identity rotation RNG; entropy when unset
    #[serde(rename = "identity-seed")]
    pub identity_seed: Option<u64>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_timeout_ms: 15_000,
            image_timeout_ms: 10_000,
            download_images: true,
            identity_seed: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the ZIP bundle; a timestamped name is used when unset
    #[serde(rename = "bundle-path")]
    pub bundle_path: Option<String>,

    /// Path to the SQLite database file; results are not persisted when unset
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

//! Configuration module for Site-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section and key is optional; missing values fall back to the defaults
//! of a polite single-threaded crawl.
//!
//! # Example
//!
//! ```no_run
//! use site_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Delay between requests: {}ms", config.crawler.request_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetchConfig, OutputConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, hash_config_content, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;

//! Output module for exporting crawl results
//!
//! This module handles:
//! - Packaging results as a ZIP bundle (JSON, CSV and image files)
//! - Computing and printing crawl statistics

mod bundle;
pub mod stats;

pub use bundle::{
    build_bundle, default_bundle_name, image_entry_name, links_csv, write_bundle, write_bundle_file,
    DATA_FILE, IMAGES_DIR, LINKS_FILE,
};
pub use stats::{content_sample, print_sample, print_statistics, ContentSample, CrawlStatistics};

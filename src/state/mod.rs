//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: frontier, visited set and results of the crawl in progress
//! - `CrawlPhase`: Init → Running → Done lifecycle
//! - `CrawlResults`: what a finished crawl hands to export and storage
//! - `PageContent`: the structured record extracted from one page

mod crawl_state;
mod page_content;

// Re-export main types
pub use crawl_state::{CrawlPhase, CrawlResults, CrawlState, FailedPage};
pub use page_content::{Heading, HeadingLevel, Image, Link, PageContent};

//! Statistics generation from crawl results
//!
//! This module provides functionality for summarizing a finished crawl
//! and displaying the figures on stdout.

use crate::state::CrawlResults;

/// Maximum characters of the first paragraph shown in a content sample
pub const SAMPLE_PARAGRAPH_CHARS: usize = 300;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Host the crawl was restricted to
    pub base_domain: String,

    /// Pages with an extracted record
    pub pages_extracted: usize,

    /// Pages that were fetched but failed
    pub pages_failed: usize,

    /// Links recorded across every page, duplicates included
    pub total_links: usize,

    /// Images downloaded across every page
    pub total_images: usize,

    /// Total image payload size in bytes
    pub image_bytes: usize,

    /// Wall-clock crawl duration in seconds
    pub duration_seconds: f64,

    /// Whether the crawl stopped before its frontier was drained
    pub cancelled: bool,
}

impl CrawlStatistics {
    /// Computes statistics from crawl results
    pub fn from_results(results: &CrawlResults) -> Self {
        let image_bytes = results
            .pages
            .values()
            .flat_map(|page| page.images.iter())
            .map(|image| image.data.len())
            .sum();

        Self {
            base_domain: results.base_domain.clone(),
            pages_extracted: results.page_count(),
            pages_failed: results.failures.len(),
            total_links: results.link_count(),
            total_images: results.image_count(),
            image_bytes,
            duration_seconds: results.duration().num_milliseconds() as f64 / 1000.0,
            cancelled: results.cancelled,
        }
    }

    /// Share of attempted pages that produced a record, in percent
    pub fn success_rate(&self) -> f64 {
        let attempted = self.pages_extracted + self.pages_failed;
        if attempted == 0 {
            0.0
        } else {
            (self.pages_extracted as f64 / attempted as f64) * 100.0
        }
    }
}

/// Title and opening text of the first extracted page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSample {
    pub url: String,
    pub title: String,
    pub first_paragraph: Option<String>,
}

/// Picks the first page (by URL order) as a content sample
///
/// The paragraph is cut to [`SAMPLE_PARAGRAPH_CHARS`] characters.
pub fn content_sample(results: &CrawlResults) -> Option<ContentSample> {
    let (url, page) = results.pages.iter().next()?;

    let first_paragraph = page.paragraphs.first().map(|text| {
        if text.chars().count() > SAMPLE_PARAGRAPH_CHARS {
            let cut: String = text.chars().take(SAMPLE_PARAGRAPH_CHARS).collect();
            format!("{}...", cut)
        } else {
            text.clone()
        }
    });

    Some(ContentSample {
        url: url.clone(),
        title: page.title.clone(),
        first_paragraph,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Domain: {}", stats.base_domain);
    println!("  Pages extracted: {}", stats.pages_extracted);
    println!("  Pages failed: {}", stats.pages_failed);
    println!("  Total links found: {}", stats.total_links);
    println!(
        "  Images downloaded: {} ({} bytes)",
        stats.total_images, stats.image_bytes
    );
    println!("  Duration: {:.1}s", stats.duration_seconds);
    if stats.cancelled {
        println!("  Stopped early: yes");
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully extracted)",
        stats.success_rate(),
        stats.pages_extracted,
        stats.pages_extracted + stats.pages_failed
    );
}

/// Prints a content sample to stdout
pub fn print_sample(sample: &ContentSample) {
    println!("\n=== Sample Content ===\n");
    println!("URL: {}", sample.url);
    println!("Title: {}", sample.title);
    if let Some(paragraph) = &sample.first_paragraph {
        println!("First paragraph: {}", paragraph);
    }
}

//! ZIP export bundle
//!
//! A bundle holds:
//! - `scraped_data.json`: the full results mapping, pretty-printed
//! - `links.csv`: one row per extracted link (`source_url,link_text,link_url`),
//!   only when at least one link exists
//! - `images/<host>_<page>_<index>.<ext>`: every downloaded image

use crate::state::CrawlResults;
use crate::OutputError;
use chrono::{DateTime, TimeZone};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DATA_FILE: &str = "scraped_data.json";
pub const LINKS_FILE: &str = "links.csv";
pub const IMAGES_DIR: &str = "images";

const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// File name for a bundle created at `now`
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use site_harvest::output::default_bundle_name;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
/// assert_eq!(default_bundle_name(&now), "website_content_20240309_140530.zip");
/// ```
pub fn default_bundle_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("website_content_{}.zip", now.format("%Y%m%d_%H%M%S"))
}

/// Writes the bundle into any seekable writer and returns the writer
pub fn write_bundle<W: Write + Seek>(results: &CrawlResults, writer: W) -> Result<W, OutputError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    zip.start_file(DATA_FILE, options)?;
    zip.write_all(&serde_json::to_vec_pretty(&results.pages)?)?;

    if let Some(csv) = links_csv(results)? {
        zip.start_file(LINKS_FILE, options)?;
        zip.write_all(&csv)?;
    }

    for (page_index, (page_url, content)) in results.pages.iter().enumerate() {
        let host = page_host(page_url, &results.base_domain);
        for (image_index, image) in content.images.iter().enumerate() {
            let name = image_entry_name(&host, page_index, image_index, &image.src);
            zip.start_file(name, options)?;
            zip.write_all(&image.data)?;
        }
    }

    Ok(zip.finish()?)
}

/// Builds the bundle in memory
pub fn build_bundle(results: &CrawlResults) -> Result<Vec<u8>, OutputError> {
    Ok(write_bundle(results, Cursor::new(Vec::new()))?.into_inner())
}

/// Writes the bundle to a file, replacing any existing file
pub fn write_bundle_file(results: &CrawlResults, path: &Path) -> Result<(), OutputError> {
    let file = BufWriter::new(File::create(path)?);
    let mut writer = write_bundle(results, file)?;
    writer.flush()?;
    Ok(())
}

/// Flattens every page's links into CSV
///
/// Returns `None` when no page has links.
pub fn links_csv(results: &CrawlResults) -> Result<Option<Vec<u8>>, OutputError> {
    if results.link_count() == 0 {
        return Ok(None);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["source_url", "link_text", "link_url"])?;
    for (source_url, content) in &results.pages {
        for link in &content.links {
            writer.write_record([source_url.as_str(), link.text.as_str(), link.url.as_str()])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(Some(bytes))
}

/// Archive path of one image
///
/// The page index keeps names unique when several pages of the same host
/// carry images.
pub fn image_entry_name(host: &str, page_index: usize, image_index: usize, src: &str) -> String {
    format!(
        "{}/{}_{}_{}.{}",
        IMAGES_DIR,
        host,
        page_index,
        image_index,
        image_extension(src)
    )
}

fn page_host(page_url: &str, fallback: &str) -> String {
    Url::parse(page_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| fallback.to_string())
}

fn image_extension(src: &str) -> String {
    let extension = Url::parse(src).ok().and_then(|url| {
        let segment = url.path_segments()?.last()?.to_string();
        let (_, ext) = segment.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        let plausible = !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric());
        plausible.then_some(ext)
    });

    extension.unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}

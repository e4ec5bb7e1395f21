//! Content extraction for fetched pages
//!
//! Turns a fetched body into a [`PageContent`] record plus the outbound links
//! used for frontier expansion. Markup is parsed first; image references are
//! then downloaded one after another. An image whose download fails is left
//! out of the record.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{parse_page, ParsedPage, Selectors};
use crate::state::{Image, Link, PageContent};
use crate::CrawlError;
use url::Url;

/// Builds page records from fetched markup
#[derive(Debug)]
pub struct Extractor {
    selectors: Selectors,
    download_images: bool,
}

impl Extractor {
    /// Creates an extractor
    ///
    /// # Arguments
    ///
    /// * `download_images` - When false, no image entries are produced
    pub fn new(download_images: bool) -> Result<Self, CrawlError> {
        Ok(Self {
            selectors: Selectors::new()?,
            download_images,
        })
    }

    /// Extracts the page record and its outbound links
    ///
    /// The returned link list is the same, in the same order, as
    /// `content.links[*].url`.
    pub async fn extract(
        &self,
        page_url: &Url,
        body: &str,
        base_domain: &str,
        fetcher: &mut Fetcher,
    ) -> (PageContent, Vec<Url>) {
        let ParsedPage {
            title,
            meta_description,
            headings,
            paragraphs,
            links: parsed_links,
            images: image_refs,
        } = parse_page(body, page_url, base_domain, &self.selectors);

        let mut images = Vec::new();
        if self.download_images {
            for image in image_refs {
                match fetcher.fetch_image(&image.src).await {
                    Ok(data) => images.push(Image {
                        src: image.src.into(),
                        alt: image.alt,
                        data,
                    }),
                    Err(e) => {
                        tracing::debug!("Skipping image on {}: {}", page_url, e);
                    }
                }
            }
        }

        let mut links = Vec::with_capacity(parsed_links.len());
        let mut outbound = Vec::with_capacity(parsed_links.len());
        for link in parsed_links {
            links.push(Link {
                text: link.text,
                url: link.url.to_string(),
            });
            outbound.push(link.url);
        }

        let content = PageContent {
            title,
            meta_description,
            headings,
            paragraphs,
            links,
            images,
        };

        (content, outbound)
    }
}

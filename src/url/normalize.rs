use crate::url::domain::is_same_domain;
use url::Url;

/// Reference prefixes that never lead to a crawlable page
const NON_NAVIGABLE_PREFIXES: &[&str] = &["#", "mailto:", "tel:", "javascript:", "data:"];

/// Normalizes a discovered link against the page it was found on
///
/// # Normalization Steps
///
/// 1. Trim the href; reject if empty
/// 2. Reject fragment-only, `mailto:`, `tel:`, `javascript:` and `data:` references
/// 3. Resolve against `parent` using standard relative-URL rules
/// 4. Reject anything that is not HTTP or HTTPS after resolution
/// 5. Reject URLs whose host and port differ from `base_domain` (exact match,
///    subdomains excluded)
/// 6. Remove the fragment
///
/// Any failure yields `None`; this function never errors.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_harvest::url::normalize;
///
/// let parent = Url::parse("https://example.com/docs/intro").unwrap();
/// let url = normalize("../about#team", &parent, "example.com").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
///
/// assert!(normalize("https://other.com/", &parent, "example.com").is_none());
/// ```
pub fn normalize(raw_href: &str, parent: &Url, base_domain: &str) -> Option<Url> {
    let href = raw_href.trim();

    if href.is_empty() || is_non_navigable(href) {
        return None;
    }

    let mut url = parent.join(href).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    if !is_same_domain(&url, base_domain) {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}

/// Checks that a URL string has both a scheme and a host
///
/// Used to gate the seed URL before a crawl starts.
///
/// # Examples
///
/// ```
/// use site_harvest::url::is_valid_url;
///
/// assert!(is_valid_url("https://example.com/start"));
/// assert!(!is_valid_url("example.com/start"));
/// assert!(!is_valid_url("mailto:someone@example.com"));
/// ```
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            !parsed.scheme().is_empty() && parsed.host_str().map_or(false, |h| !h.is_empty())
        }
        Err(_) => false,
    }
}

fn is_non_navigable(href: &str) -> bool {
    NON_NAVIGABLE_PREFIXES.iter().any(|prefix| {
        href.get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix))
    })
}

use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// An explicit non-default port is kept as `host:port`, so two servers on the
/// same host are different sites.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com:8080".to_string()));
///
/// let url = Url::parse("https://example.com:443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true if the URL's host and explicit port are exactly `base_domain`
///
/// Subdomains are distinct hosts: `blog.example.com` is not `example.com`.
pub fn is_same_domain(url: &Url, base_domain: &str) -> bool {
    extract_domain(url)
        .map(|domain| domain.eq_ignore_ascii_case(base_domain))
        .unwrap_or(false)
}

use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercase host without any port. This is what domain scope
/// patterns are matched against.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_search::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the politeness key for a URL: the host plus any non-default port
///
/// Two servers on the same machine but different ports keep separate
/// robots.txt rules and request delays.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_search::url::host_key;
///
/// let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
///
/// let url = Url::parse("https://example.com:443/a").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

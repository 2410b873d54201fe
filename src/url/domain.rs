use crate::url::CanonicalUrl;

/// Returns true iff the URL's host equals the seed host exactly
///
/// There is no subdomain generalization: `blog.example.com` is external to a
/// crawl seeded at `example.com`. Ports are not part of the host.
///
/// # Examples
///
/// ```
/// use sitegraph::url::{canonicalize, is_internal};
///
/// let url = canonicalize("https://example.com/page", None).unwrap();
/// assert!(is_internal(&url, "example.com"));
/// assert!(!is_internal(&url, "www.example.com"));
/// ```
pub fn is_internal(url: &CanonicalUrl, seed_host: &str) -> bool {
    url.host().eq_ignore_ascii_case(seed_host)
}

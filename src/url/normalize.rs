use crate::url::CanonicalUrl;
use crate::UrlError;
use url::Url;

/// Canonicalizes a raw, possibly relative, URL
///
/// # Normalization Steps
///
/// 1. Trim whitespace; reject empty and fragment-only references
/// 2. Resolve against `base` when given, otherwise parse as absolute
/// 3. Accept only `http` and `https`
/// 4. Lowercase scheme and host (the URL parser already does this)
/// 5. Strip the default port (80 for http, 443 for https)
/// 6. Remove the fragment
/// 7. Collapse an empty path to `/` and drop trailing slashes elsewhere
/// 8. Leave the query string untouched
///
/// Canonicalization is idempotent: feeding the output back in returns it
/// unchanged.
///
/// # Arguments
///
/// * `raw` - The URL or href to canonicalize
/// * `base` - The URL relative references are resolved against
///
/// # Returns
///
/// * `Ok(CanonicalUrl)` - Normalized URL
/// * `Err(UrlError)` - The reference is invalid and must be dropped
///
/// # Examples
///
/// ```
/// use sitegraph::url::canonicalize;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/docs/").unwrap();
/// let url = canonicalize("../About/?b=2&a=1#team", Some(&base)).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/About?b=2&a=1");
/// ```
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Result<CanonicalUrl, UrlError> {
    // Step 1: Reject references that can never name another page
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Empty);
    }
    if raw.starts_with('#') {
        return Err(UrlError::FragmentOnly(raw.to_string()));
    }

    // Step 2: Resolve
    let parsed = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    let mut url = parsed.map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    // Step 3: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // Step 4: Host must exist
    match url.host_str() {
        Some(host) if !host.is_empty() => {
            if host.chars().any(|c| c.is_ascii_uppercase()) {
                let lowered = host.to_ascii_lowercase();
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
            }
        }
        _ => return Err(UrlError::MissingHost),
    }

    // Step 5: Strip default port
    if url.port().is_some() && url.port() == default_port(url.scheme()) {
        url.set_port(None).map_err(|_| UrlError::MissingHost)?;
    }

    // Step 6: Remove fragment
    url.set_fragment(None);

    // Step 7: Normalize path
    let path = normalize_path(url.path());
    url.set_path(&path);

    Ok(CanonicalUrl::from_normalized(url))
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Applies the trailing-slash policy: only the root keeps its slash
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

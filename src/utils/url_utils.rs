//! URL manipulation utilities.
//!
//! This module provides the canonical dedup key used by the crawl engine
//! along with small helpers for validating and resolving discovered links.

use url::Url;
use url::form_urlencoded;

use super::constants::{INDEX_DOCUMENTS, TRACKING_QUERY_PARAMS};

/// Canonicalize a URL into the key used for duplicate detection.
///
/// - scheme and host lowercased, default port dropped
/// - fragment dropped
/// - trailing `/index.{html,htm,php,aspx}` and trailing `/` stripped, empty path becomes `/`
/// - tracking parameters removed, remaining parameters sorted by name
///
/// Never fails: input that does not parse as a hierarchical URL is returned unchanged.
///
/// ```
/// use kodegen_tools_goalcrawl::utils::normalize_url;
/// assert_eq!(
///     normalize_url("HTTP://Example.com:80/a/"),
///     normalize_url("http://example.com/a"),
/// );
/// ```
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return raw.to_string();
    };

    let scheme = parsed.scheme();
    let port = match (scheme, parsed.port()) {
        ("http", Some(80)) | ("https", Some(443)) | (_, None) => None,
        (_, Some(port)) => Some(port),
    };

    let path = strip_trailing_index(parsed.path());

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !TRACKING_QUERY_PARAMS.contains(&name.as_ref()))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    // Stable sort keeps repeated names in their original order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    let mut normalized = format!("{scheme}://{host}");
    if let Some(port) = port {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }
    normalized.push_str(&path);

    if !params.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();
        normalized.push('?');
        normalized.push_str(&query);
    }

    normalized
}

/// Strip trailing index documents and slashes until neither applies.
fn strip_trailing_index(path: &str) -> String {
    let mut current = path;
    loop {
        let before = current.len();

        if let Some(stripped) = current.strip_suffix('/') {
            current = stripped;
        }
        for doc in INDEX_DOCUMENTS {
            let lower = current.to_ascii_lowercase();
            if lower.ends_with(&format!("/{doc}")) {
                current = &current[..current.len() - doc.len() - 1];
            }
        }

        if current.len() == before {
            break;
        }
    }

    if current.is_empty() {
        "/".to_string()
    } else {
        current.to_string()
    }
}

/// Check if a URL is a crawlable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Resolve a possibly-relative link against the page it was found on.
///
/// Returns `None` for links that cannot be resolved or are not http(s).
#[must_use]
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = match Url::parse(href) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(href).ok()?,
        Err(_) => return None,
    };

    let resolved = resolved.to_string();
    is_valid_url(&resolved).then_some(resolved)
}

/// Extract the host of a URL, lowercased.
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_documents_collapse_into_directory() {
        assert_eq!(normalize_url("https://x.test/docs/index.html"), "https://x.test/docs");
        assert_eq!(normalize_url("https://x.test/INDEX.PHP"), "https://x.test/");
        assert_eq!(normalize_url("https://x.test/a/index.html/"), "https://x.test/a");
    }

    #[test]
    fn unparseable_input_is_returned_unchanged() {
        assert_eq!(normalize_url("not a url"), "not a url");
        assert_eq!(normalize_url("mailto:someone@x.test"), "mailto:someone@x.test");
    }

    #[test]
    fn relative_links_resolve_against_base() {
        assert_eq!(
            resolve_link("https://x.test/docs/intro", "../pricing").as_deref(),
            Some("https://x.test/pricing")
        );
        assert_eq!(resolve_link("https://x.test/", "#top"), None);
        assert_eq!(resolve_link("https://x.test/", "javascript:void(0)"), None);
    }
}

//! Dedup key properties of the URL normalizer

use kodegen_tools_goalcrawl::utils::{normalize_url, resolve_link};
use proptest::prelude::*;

#[test]
fn equivalent_spellings_share_a_key() {
    let key = normalize_url("https://example.com/docs");
    for variant in [
        "https://example.com/docs/",
        "https://EXAMPLE.com/docs#section",
        "https://example.com:443/docs",
        "https://example.com/docs/index.html",
        "https://example.com/docs?utm_source=newsletter&utm_campaign=x",
        "https://example.com/docs/index.html/",
    ] {
        assert_eq!(normalize_url(variant), key, "{variant}");
    }
}

#[test]
fn query_parameters_are_sorted_and_kept() {
    assert_eq!(
        normalize_url("https://example.com/search?q=rust&a=1&gclid=abc"),
        "https://example.com/search?a=1&q=rust"
    );
}

#[test]
fn distinct_pages_keep_distinct_keys() {
    assert_ne!(
        normalize_url("https://example.com/a"),
        normalize_url("https://example.com/b")
    );
    assert_ne!(
        normalize_url("http://example.com/a"),
        normalize_url("https://example.com/a")
    );
    assert_ne!(
        normalize_url("https://example.com:8443/a"),
        normalize_url("https://example.com/a")
    );
}

#[test]
fn links_resolve_against_their_page() {
    assert_eq!(
        resolve_link("https://example.com/docs/intro", "../api").as_deref(),
        Some("https://example.com/api")
    );
    assert_eq!(resolve_link("https://example.com/", "#top"), None);
    assert_eq!(resolve_link("https://example.com/", "mailto:a@example.com"), None);
    assert_eq!(resolve_link("https://example.com/", "javascript:void(0)"), None);
}

proptest! {
    #[test]
    fn normalization_is_idempotent(
        host in "[a-z]{1,10}\\.(com|org|test)",
        segments in prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..4),
        trailing in prop::sample::select(vec!["", "/", "/index.html", "/index.php/"]),
        query in prop::option::of("[a-z]{1,5}=[a-z0-9]{0,5}"),
        fragment in prop::option::of("[a-z]{1,6}"),
    ) {
        let mut url = format!("https://{host}/{}{trailing}", segments.join("/"));
        if let Some(query) = query {
            url.push('?');
            url.push_str(&query);
        }
        if let Some(fragment) = fragment {
            url.push('#');
            url.push_str(&fragment);
        }

        let once = normalize_url(&url);
        prop_assert_eq!(normalize_url(&once), once);
    }

    #[test]
    fn trailing_slash_never_changes_the_key(
        host in "[a-z]{1,10}\\.com",
        path in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
    ) {
        prop_assert_eq!(
            normalize_url(&format!("https://{host}/{path}")),
            normalize_url(&format!("https://{host}/{path}/"))
        );
    }
}

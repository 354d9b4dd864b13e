//! Coarse near-duplicate fingerprint of a page's opening content
//!
//! The signature covers the first three `h1`/`h2`/`h3` headings and the first
//! 100 characters of the first paragraph. Collisions are acceptable: they
//! only ever suppress a later page, never the first one seen.

use scraper::{Html, Selector};
use std::sync::LazyLock;
use xxhash_rust::xxh3::xxh3_64;

static HEADING_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").ok());
static PARAGRAPH_SELECTOR: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("p").ok());

const MAX_HEADINGS: usize = 3;
const PARAGRAPH_PREFIX_CHARS: usize = 100;

/// Text the signature is computed from, `None` when the page has neither
/// headings nor a paragraph
#[must_use]
pub fn signature_input(html: &str) -> Option<String> {
    let (Some(headings), Some(paragraphs)) = (HEADING_SELECTOR.as_ref(), PARAGRAPH_SELECTOR.as_ref())
    else {
        return None;
    };
    let document = Html::parse_document(html);

    let mut parts: Vec<String> = document
        .select(headings)
        .take(MAX_HEADINGS)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .collect();

    if let Some(first) = document.select(paragraphs).next() {
        let text = collapse_whitespace(&first.text().collect::<String>());
        parts.push(text.chars().take(PARAGRAPH_PREFIX_CHARS).collect());
    }

    let joined = parts.join("|");
    if joined.chars().all(|c| c == '|') {
        None
    } else {
        Some(joined)
    }
}

/// Fingerprint `html`, returning an empty string when there is nothing to sign
#[must_use]
pub fn content_signature(html: &str) -> String {
    signature_input(html)
        .map(|input| format!("{:016x}", xxh3_64(input.as_bytes())))
        .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_three_headings_count() {
        let html = "<h1>A</h1><h2>B</h2><h3>C</h3><h2>D</h2><p>body</p>";
        assert_eq!(signature_input(html).as_deref(), Some("A|B|C|body"));
    }

    #[test]
    fn paragraph_is_truncated_to_prefix() {
        let long = "x".repeat(250);
        let html = format!("<h1>T</h1><p>{long}</p>");
        let input = signature_input(&html).unwrap_or_default();
        assert_eq!(input.len(), "T|".len() + PARAGRAPH_PREFIX_CHARS);
    }

    #[test]
    fn empty_documents_have_no_signature() {
        assert_eq!(content_signature(""), "");
        assert_eq!(content_signature("<div><span>no headings</span></div>"), "");
    }
}

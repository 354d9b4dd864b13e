//! Final report assembly
//!
//! Every termination path ends here, so partially populated pages are
//! completed with safe defaults rather than rejected.

use chrono::Utc;

use super::crawl_state::CrawlState;
use super::crawl_types::{
    PageContent, PageMetrics, ScrapeSummary, ScrapedPage, ScraperOutput, TerminationReason,
};

/// Build the `ScraperOutput` from the current state.
///
/// `summary.execution_time` is left at zero for the caller to fill in once
/// total wall-clock time is known.
#[must_use]
pub fn assemble_output(state: &CrawlState, termination: TerminationReason) -> ScraperOutput {
    let pages: Vec<ScrapedPage> = state
        .extracted_pages()
        .iter()
        .cloned()
        .map(complete_page)
        .collect();

    let metrics = state.value_metrics();
    let summary = ScrapeSummary {
        pages_scraped: pages.len(),
        total_content_size: pages.iter().map(|page| page.content.len()).sum(),
        execution_time: 0,
        goal_completion: metrics.completeness,
        coverage_score: metrics.relevance,
    };

    ScraperOutput {
        pages,
        summary,
        termination,
        last_error: state.last_error().map(str::to_string),
    }
}

fn complete_page(page: PageContent) -> ScrapedPage {
    ScrapedPage {
        url: page.url,
        title: page.title,
        content: page.content,
        content_type: page.content_type,
        extraction_time: page.extraction_time.unwrap_or_else(Utc::now),
        metrics: page.metrics.unwrap_or_else(PageMetrics::neutral),
        links: page.links.unwrap_or_default(),
        entities: page.entities.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl_engine::crawl_types::ValueMetrics;

    fn bare_page(url: &str, content: &str) -> PageContent {
        PageContent {
            url: url.into(),
            title: format!("title of {url}"),
            content: content.into(),
            content_type: "text/html".into(),
            extraction_time: None,
            metrics: None,
            links: None,
            entities: None,
        }
    }

    #[test]
    fn empty_state_yields_valid_empty_report() {
        let state = CrawlState::new("https://x.test/", "");
        let output = assemble_output(&state, TerminationReason::Timeout);
        assert!(output.pages.is_empty());
        assert_eq!(output.summary.pages_scraped, 0);
        assert_eq!(output.summary.total_content_size, 0);
        assert_eq!(output.termination, TerminationReason::Timeout);
    }

    #[test]
    fn missing_fields_get_defaults_and_order_is_kept() {
        let mut state = CrawlState::new("https://x.test/", "");
        state.record_page(bare_page("https://x.test/b", "bbb"));
        state.record_page(bare_page("https://x.test/a", "a"));
        state.value_metrics = ValueMetrics {
            information_density: 0.4,
            relevance: 0.7,
            uniqueness: 0.6,
            completeness: 0.3,
        };

        let output = assemble_output(&state, TerminationReason::FrontierExhausted);
        let urls: Vec<&str> = output.pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, ["https://x.test/b", "https://x.test/a"]);
        assert_eq!(output.summary.total_content_size, 4);
        assert_eq!(output.summary.goal_completion, 0.3);
        assert_eq!(output.summary.coverage_score, 0.7);

        let first = &output.pages[0];
        assert!(first.links.is_empty());
        assert!(first.entities.is_empty());
        assert_eq!(first.metrics, PageMetrics::neutral());
    }
}

pub mod config;
pub mod crawl_engine;
pub mod crawl_events;
pub mod fetcher;
pub mod intelligence;
pub mod utils;

use std::sync::Arc;

pub use config::{ScrapeConfig, UrlFilters};
pub use crawl_engine::{
    CancelHandle, CrawlError, CrawlHooks, CrawlIntelligence, CrawlState, GoalCrawler,
    PageContent, PageFetcher, ScrapeSummary, ScrapedPage, ScraperOutput, TerminationReason,
};
pub use crawl_events::{ScrapeEvent, ScrapeEventBus};
pub use fetcher::{ChromiumFetcher, HttpFetcher, HybridFetcher};
pub use intelligence::HeuristicIntelligence;
pub use utils::normalize_url;

/// Crawl with the default hybrid fetcher and heuristic intelligence.
///
/// # Errors
///
/// Only fails when the HTTP client cannot be built; once the crawl starts
/// every failure is absorbed into the returned output.
pub async fn scrape(config: ScrapeConfig) -> Result<ScraperOutput, CrawlError> {
    let fetcher = Arc::new(HybridFetcher::with_defaults()?);
    let intelligence = Arc::new(HeuristicIntelligence::from_config(&config));

    let output = GoalCrawler::new(config, fetcher.clone(), intelligence)
        .run()
        .await;
    fetcher.shutdown().await;
    Ok(output)
}

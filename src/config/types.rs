//! Core configuration types for goal-directed crawling
//!
//! This module contains the main `ScrapeConfig` struct and its associated types
//! that define the configuration parameters for a crawl run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::crawl_engine::CrawlError;

use crate::utils::{
    DEFAULT_BATCH_SIZE, DEFAULT_COLLABORATOR_TIMEOUT_SECS, DEFAULT_COMPLETENESS_THRESHOLD,
    DEFAULT_DEADLOCK_CHECK_INTERVAL_MS, DEFAULT_DEADLOCK_DETECTION_MS, DEFAULT_MAX_AUTH_ATTEMPTS,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_EXECUTION_TIME_MS, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PAGES,
    DEFAULT_MAX_URL_REVISITS, DEFAULT_SUFFICIENT_PAGE_FRACTION,
};

/// Substring filters applied to discovered links before they are enqueued
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlFilters {
    /// When non-empty, a link must contain at least one of these substrings
    #[serde(default)]
    pub must_include_patterns: Vec<String>,
    /// A link containing any of these substrings is never enqueued
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl UrlFilters {
    /// Whether a link passes both the include and exclude lists
    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        if !self.must_include_patterns.is_empty()
            && !self
                .must_include_patterns
                .iter()
                .any(|pattern| url.contains(pattern.as_str()))
        {
            return false;
        }
        !self
            .exclude_patterns
            .iter()
            .any(|pattern| url.contains(pattern.as_str()))
    }
}

/// Main configuration struct for a goal-directed crawl
///
/// Deserializing goes through the same validation as
/// `ScrapeConfigBuilder::build`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredScrapeConfig")]
pub struct ScrapeConfig {
    /// Seed URL. **INVARIANT:** absolute http(s) URL (validated in builder).
    pub(crate) base_url: String,
    /// Natural-language description of what the crawl should extract
    pub(crate) scraping_goal: String,
    pub(crate) max_pages: usize,
    pub(crate) max_depth: u32,
    pub(crate) include_images: bool,
    pub(crate) execute_javascript: bool,
    pub(crate) prevent_duplicate_urls: bool,
    pub(crate) filters: UrlFilters,

    /// Hard cap on AnalyzeURL → DecideNextAction cycles (a.k.a. recursion limit)
    pub(crate) max_iterations: u32,

    /// Wall-clock budget for the whole run
    ///
    /// On expiry the run finalizes with whatever has been extracted.
    pub(crate) max_execution_time_ms: u64,

    /// Stagnation window for the deadlock detector
    ///
    /// If neither the extracted-page count nor the visited-URL count changes
    /// for this long, the run is finalized. 0 disables the detector.
    pub(crate) deadlock_detection_ms: u64,

    /// Sampling period of the deadlock detector
    pub(crate) deadlock_check_interval_ms: u64,

    /// Per-call timeout for every collaborator (fetch, intelligence, auth callback)
    pub(crate) collaborator_timeout_secs: u64,

    pub(crate) max_auth_attempts: u32,
    pub(crate) max_url_revisits: u32,
    pub(crate) completeness_threshold: f64,
    pub(crate) sufficient_page_fraction: f64,

    /// Extracted pages per `batch-complete` event
    pub(crate) batch_size: usize,

    /// Optional event bus for the streaming event feed
    ///
    /// When set, the crawler publishes `ScrapeEvent` updates to this bus and
    /// shuts it down gracefully once the run has finished.
    #[serde(skip)]
    pub(crate) event_bus: Option<Arc<crate::crawl_events::ScrapeEventBus>>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            scraping_goal: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            include_images: false,
            execute_javascript: false,
            prevent_duplicate_urls: true,
            filters: UrlFilters::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_execution_time_ms: DEFAULT_MAX_EXECUTION_TIME_MS,
            deadlock_detection_ms: DEFAULT_DEADLOCK_DETECTION_MS,
            deadlock_check_interval_ms: DEFAULT_DEADLOCK_CHECK_INTERVAL_MS,
            collaborator_timeout_secs: DEFAULT_COLLABORATOR_TIMEOUT_SECS,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            max_url_revisits: DEFAULT_MAX_URL_REVISITS,
            completeness_threshold: DEFAULT_COMPLETENESS_THRESHOLD,
            sufficient_page_fraction: DEFAULT_SUFFICIENT_PAGE_FRACTION,
            batch_size: DEFAULT_BATCH_SIZE,
            event_bus: None,
        }
    }
}

/// Wire form of `ScrapeConfig`; missing fields take the documented defaults
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoredScrapeConfig {
    base_url: String,
    scraping_goal: String,
    max_pages: usize,
    max_depth: u32,
    include_images: bool,
    execute_javascript: bool,
    prevent_duplicate_urls: bool,
    filters: UrlFilters,
    max_iterations: u32,
    max_execution_time_ms: u64,
    deadlock_detection_ms: u64,
    deadlock_check_interval_ms: u64,
    collaborator_timeout_secs: u64,
    max_auth_attempts: u32,
    max_url_revisits: u32,
    completeness_threshold: f64,
    sufficient_page_fraction: f64,
    batch_size: usize,
}

impl Default for StoredScrapeConfig {
    fn default() -> Self {
        let defaults = ScrapeConfig::default();
        Self {
            base_url: defaults.base_url,
            scraping_goal: defaults.scraping_goal,
            max_pages: defaults.max_pages,
            max_depth: defaults.max_depth,
            include_images: defaults.include_images,
            execute_javascript: defaults.execute_javascript,
            prevent_duplicate_urls: defaults.prevent_duplicate_urls,
            filters: defaults.filters,
            max_iterations: defaults.max_iterations,
            max_execution_time_ms: defaults.max_execution_time_ms,
            deadlock_detection_ms: defaults.deadlock_detection_ms,
            deadlock_check_interval_ms: defaults.deadlock_check_interval_ms,
            collaborator_timeout_secs: defaults.collaborator_timeout_secs,
            max_auth_attempts: defaults.max_auth_attempts,
            max_url_revisits: defaults.max_url_revisits,
            completeness_threshold: defaults.completeness_threshold,
            sufficient_page_fraction: defaults.sufficient_page_fraction,
            batch_size: defaults.batch_size,
        }
    }
}

impl TryFrom<StoredScrapeConfig> for ScrapeConfig {
    type Error = CrawlError;

    fn try_from(stored: StoredScrapeConfig) -> Result<Self, Self::Error> {
        Self {
            base_url: stored.base_url,
            scraping_goal: stored.scraping_goal,
            max_pages: stored.max_pages,
            max_depth: stored.max_depth,
            include_images: stored.include_images,
            execute_javascript: stored.execute_javascript,
            prevent_duplicate_urls: stored.prevent_duplicate_urls,
            filters: stored.filters,
            max_iterations: stored.max_iterations,
            max_execution_time_ms: stored.max_execution_time_ms,
            deadlock_detection_ms: stored.deadlock_detection_ms,
            deadlock_check_interval_ms: stored.deadlock_check_interval_ms,
            collaborator_timeout_secs: stored.collaborator_timeout_secs,
            max_auth_attempts: stored.max_auth_attempts,
            max_url_revisits: stored.max_url_revisits,
            completeness_threshold: stored.completeness_threshold,
            sufficient_page_fraction: stored.sufficient_page_fraction,
            batch_size: stored.batch_size,
            event_bus: None,
        }
        .validated()
    }
}

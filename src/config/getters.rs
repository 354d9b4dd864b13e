//! Read-only accessors for `ScrapeConfig`

use std::sync::Arc;
use std::time::Duration;

use super::types::{ScrapeConfig, UrlFilters};
use crate::crawl_events::ScrapeEventBus;

impl ScrapeConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn scraping_goal(&self) -> &str {
        &self.scraping_goal
    }

    #[must_use]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub fn include_images(&self) -> bool {
        self.include_images
    }

    #[must_use]
    pub fn execute_javascript(&self) -> bool {
        self.execute_javascript
    }

    #[must_use]
    pub fn prevent_duplicate_urls(&self) -> bool {
        self.prevent_duplicate_urls
    }

    #[must_use]
    pub fn filters(&self) -> &UrlFilters {
        &self.filters
    }

    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    #[must_use]
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }

    /// Stagnation window, `None` when the detector is disabled
    #[must_use]
    pub fn deadlock_detection(&self) -> Option<Duration> {
        (self.deadlock_detection_ms > 0).then(|| Duration::from_millis(self.deadlock_detection_ms))
    }

    #[must_use]
    pub fn deadlock_check_interval(&self) -> Duration {
        Duration::from_millis(self.deadlock_check_interval_ms)
    }

    #[must_use]
    pub fn collaborator_timeout_secs(&self) -> u64 {
        self.collaborator_timeout_secs
    }

    #[must_use]
    pub fn max_auth_attempts(&self) -> u32 {
        self.max_auth_attempts
    }

    #[must_use]
    pub fn max_url_revisits(&self) -> u32 {
        self.max_url_revisits
    }

    #[must_use]
    pub fn completeness_threshold(&self) -> f64 {
        self.completeness_threshold
    }

    #[must_use]
    pub fn sufficient_page_fraction(&self) -> f64 {
        self.sufficient_page_fraction
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<ScrapeEventBus>> {
        self.event_bus.as_ref()
    }
}

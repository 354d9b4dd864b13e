//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! The seed URL is the only required field; `build()` only exists once it
//! has been supplied. Everything else falls back to the documented defaults
//! in `utils::constants`.

use std::marker::PhantomData;
use std::sync::Arc;

use super::types::{ScrapeConfig, UrlFilters};
use crate::crawl_engine::CrawlError;
use crate::crawl_events::ScrapeEventBus;
use crate::utils::is_valid_url;

// Type states for the builder
pub struct WithBaseUrl;

pub struct ScrapeConfigBuilder<State = ()> {
    config: ScrapeConfig,
    _phantom: PhantomData<State>,
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        Self {
            config: ScrapeConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl ScrapeConfig {
    /// Create a builder for configuring a `ScrapeConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder<()> {
        ScrapeConfigBuilder::default()
    }
}

impl ScrapeConfigBuilder<()> {
    pub fn base_url(self, url: impl Into<String>) -> ScrapeConfigBuilder<WithBaseUrl> {
        let mut config = self.config;
        config.base_url = url.into();
        ScrapeConfigBuilder {
            config,
            _phantom: PhantomData,
        }
    }
}

impl<State> ScrapeConfigBuilder<State> {
    #[must_use]
    pub fn scraping_goal(mut self, goal: impl Into<String>) -> Self {
        self.config.scraping_goal = goal.into();
        self
    }

    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn include_images(mut self, include: bool) -> Self {
        self.config.include_images = include;
        self
    }

    #[must_use]
    pub fn execute_javascript(mut self, execute: bool) -> Self {
        self.config.execute_javascript = execute;
        self
    }

    #[must_use]
    pub fn prevent_duplicate_urls(mut self, prevent: bool) -> Self {
        self.config.prevent_duplicate_urls = prevent;
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: UrlFilters) -> Self {
        self.config.filters = filters;
        self
    }

    #[must_use]
    pub fn must_include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.filters.must_include_patterns.push(pattern.into());
        self
    }

    #[must_use]
    pub fn exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.filters.exclude_patterns.push(pattern.into());
        self
    }

    /// Alias kept for callers configured in terms of a recursion limit
    #[must_use]
    pub fn recursion_limit(self, limit: u32) -> Self {
        self.max_iterations(limit)
    }

    #[must_use]
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn max_execution_time_ms(mut self, ms: u64) -> Self {
        self.config.max_execution_time_ms = ms;
        self
    }

    #[must_use]
    pub fn deadlock_detection_ms(mut self, ms: u64) -> Self {
        self.config.deadlock_detection_ms = ms;
        self
    }

    #[must_use]
    pub fn deadlock_check_interval_ms(mut self, ms: u64) -> Self {
        self.config.deadlock_check_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn collaborator_timeout_secs(mut self, secs: u64) -> Self {
        self.config.collaborator_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn max_auth_attempts(mut self, attempts: u32) -> Self {
        self.config.max_auth_attempts = attempts;
        self
    }

    #[must_use]
    pub fn max_url_revisits(mut self, revisits: u32) -> Self {
        self.config.max_url_revisits = revisits;
        self
    }

    #[must_use]
    pub fn completeness_threshold(mut self, threshold: f64) -> Self {
        self.config.completeness_threshold = threshold;
        self
    }

    #[must_use]
    pub fn sufficient_page_fraction(mut self, fraction: f64) -> Self {
        self.config.sufficient_page_fraction = fraction;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    #[must_use]
    pub fn event_bus(mut self, bus: Arc<ScrapeEventBus>) -> Self {
        self.config.event_bus = Some(bus);
        self
    }
}

impl ScrapeConfigBuilder<WithBaseUrl> {
    /// Validate and produce the final configuration
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::Config` when the seed URL is not an absolute
    /// http(s) URL or a numeric limit is zero.
    pub fn build(self) -> Result<ScrapeConfig, CrawlError> {
        self.config.validated()
    }
}

impl ScrapeConfig {
    /// Check required invariants and clamp tunables into range
    ///
    /// Shared by the builder and deserialization, so a persisted config
    /// reloads with the same guarantees as a built one.
    pub(crate) fn validated(mut self) -> Result<Self, CrawlError> {
        self.base_url = self.base_url.trim().to_string();

        if !is_valid_url(&self.base_url) {
            return Err(CrawlError::Config(format!(
                "base URL must be an absolute http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.max_pages == 0 {
            return Err(CrawlError::Config("max_pages must be at least 1".into()));
        }
        if self.max_iterations == 0 {
            return Err(CrawlError::Config("max_iterations must be at least 1".into()));
        }
        if self.max_execution_time_ms == 0 {
            return Err(CrawlError::Config(
                "max_execution_time_ms must be at least 1".into(),
            ));
        }

        self.completeness_threshold = clamp_fraction(self.completeness_threshold);
        self.sufficient_page_fraction = clamp_fraction(self.sufficient_page_fraction);
        self.deadlock_check_interval_ms = self.deadlock_check_interval_ms.max(1);
        self.collaborator_timeout_secs = self.collaborator_timeout_secs.max(1);
        self.batch_size = self.batch_size.max(1);

        Ok(self)
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

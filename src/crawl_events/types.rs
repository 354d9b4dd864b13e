//! Event type definitions for the scrape event feed
//!
//! Observers (status dashboards, job runners, loggers) follow a run through
//! these events. Per URL they arrive in pipeline order:
//! `url-processing → url-fetch(fetching) → url-fetch(complete) → url-extract →
//! url-links → url-complete`, interleaved with run-level `progress` and
//! `batch-complete`, and closed by `scraping-complete` and `shutdown`.
//! Skipped URLs simply stop early, so consumers must not assume every event
//! type is delivered exactly once per URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crawl_engine::crawl_types::PageMetrics;

/// Reason for event bus shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShutdownReason {
    /// Run finished and its output has been assembled
    ScrapeCompleted,
    /// Run was cancelled by the caller
    Cancelled,
    /// Unrecoverable error outside the crawl (e.g. in the host application)
    Error(String),
}

/// Phase of a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    Fetching,
    Complete,
}

/// Events emitted during a crawl run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ScrapeEvent {
    /// A URL entered the pipeline
    UrlProcessing {
        url: String,
        depth: u32,
        timestamp: DateTime<Utc>,
    },
    /// A fetch started or finished
    UrlFetch {
        url: String,
        status: FetchPhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        use_javascript: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_length: Option<usize>,
    },
    /// Content was extracted from the page
    UrlExtract { url: String },
    /// Outgoing links were discovered on the page
    UrlLinks { url: String, link_count: usize },
    /// The URL finished its pass through the pipeline with extracted content
    UrlComplete {
        url: String,
        title: String,
        metrics: PageMetrics,
        link_count: usize,
        content_length: usize,
        processing_time_ms: u64,
    },
    /// Run-level progress after each decision
    Progress {
        pages_scraped: usize,
        queue_size: usize,
        goal_completion: f64,
    },
    /// A batch of extracted pages is done
    BatchComplete {
        processed_in_batch: usize,
        extracted_total: usize,
    },
    /// Final summary of the run
    ScrapingComplete {
        pages_scraped: usize,
        total_content_size: usize,
        execution_time_ms: u64,
        goal_completion: f64,
        coverage_score: f64,
    },
    /// A failure worth surfacing to observers; the run itself continues or ends gracefully
    Error { error: String },
    /// Signals that the event bus is shutting down
    ///
    /// Subscribers should exit their event loops when receiving this event.
    Shutdown {
        reason: ShutdownReason,
        timestamp: DateTime<Utc>,
    },
}

/// Result of publishing a batch of events
///
/// Always represents successful execution of the batch operation itself;
/// the fields report how many individual events were delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPublishResult {
    pub total: usize,
    pub published: usize,
    /// Events that failed to publish (no active subscribers)
    pub failed: usize,
    pub max_subscribers: usize,
}

impl BatchPublishResult {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.published == self.total && self.failed == 0
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Helper functions for creating common events
impl ScrapeEvent {
    #[must_use]
    pub fn url_processing(url: impl Into<String>, depth: u32) -> Self {
        Self::UrlProcessing {
            url: url.into(),
            depth,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn fetch_started(url: impl Into<String>, use_javascript: bool) -> Self {
        Self::UrlFetch {
            url: url.into(),
            status: FetchPhase::Fetching,
            use_javascript: Some(use_javascript),
            content_length: None,
        }
    }

    #[must_use]
    pub fn fetch_completed(url: impl Into<String>, content_length: usize) -> Self {
        Self::UrlFetch {
            url: url.into(),
            status: FetchPhase::Complete,
            use_javascript: None,
            content_length: Some(content_length),
        }
    }

    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    #[must_use]
    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::Shutdown {
            reason,
            timestamp: Utc::now(),
        }
    }

    /// Wire name of the event type, as used in the serialized `type` tag
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UrlProcessing { .. } => "url-processing",
            Self::UrlFetch { .. } => "url-fetch",
            Self::UrlExtract { .. } => "url-extract",
            Self::UrlLinks { .. } => "url-links",
            Self::UrlComplete { .. } => "url-complete",
            Self::Progress { .. } => "progress",
            Self::BatchComplete { .. } => "batch-complete",
            Self::ScrapingComplete { .. } => "scraping-complete",
            Self::Error { .. } => "error",
            Self::Shutdown { .. } => "shutdown",
        }
    }

    /// URL the event is about, for per-URL events
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::UrlProcessing { url, .. }
            | Self::UrlFetch { url, .. }
            | Self::UrlExtract { url }
            | Self::UrlLinks { url, .. }
            | Self::UrlComplete { url, .. } => Some(url),
            _ => None,
        }
    }
}

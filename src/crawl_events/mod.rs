//! Streaming event feed for observing a crawl run
//!
//! This module provides a broadcast event bus for publishing and
//! subscribing to scrape events, with metrics and filtered subscriptions.

// Sub-modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod streaming;
pub mod types;

// Re-exports for public API
pub use bus::ScrapeEventBus;
pub use config::{BackpressureMode, EventBusConfig};
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use streaming::FilteredReceiver;
pub use types::{BatchPublishResult, FetchPhase, ScrapeEvent, ShutdownReason};

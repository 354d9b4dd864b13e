//! Configuration module for goal-directed crawling
//!
//! This module provides the `ScrapeConfig` struct and its type-safe builder
//! for configuring a crawl run with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{ScrapeConfigBuilder, WithBaseUrl};
pub use types::{ScrapeConfig, UrlFilters};

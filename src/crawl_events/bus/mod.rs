//! Event bus for publishing and subscribing to scrape events
//!
//! Split by concern: construction, publishing, subscription, shutdown and
//! metrics reporting each live in their own file.

// Core struct and constructors
mod core;

// Functionality implementations
mod impls;
mod metrics_reporting;
mod publishing;
mod shutdown;
mod subscription;

// Re-export the main type
pub use core::ScrapeEventBus;

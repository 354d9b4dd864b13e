//! Crawl Engine Module
//!
//! This module contains the goal-directed crawling engine: the data model,
//! the frontier and dedup primitives, the stage-by-stage orchestrator, the
//! safety nets that guarantee termination and the run driver tying them
//! together.

// Sub-modules
pub mod collaborator_timeout;
pub mod collaborators;
pub mod content_signature;
pub mod crawl_state;
pub mod crawl_types;
pub mod execution;
pub mod execution_guard;
pub mod frontier;
pub mod orchestrator;
pub mod output;
pub mod termination;
pub mod watchdog;

// Re-exports for public API
pub use execution::GoalCrawler;

// Re-export collaborator contracts
pub use collaborators::{
    AuthDetection, AuthHandler, AuthRequest, CrawlHooks, CrawlIntelligence, DiscoveredLink,
    ExtractedContent, FetchOptions, FetchResponse, NavigationAction, NavigationDecision,
    PageCallback, PageFetcher, UrlAnalysis,
};

// Re-export state machine types for advanced usage
pub use crawl_state::{CrawlState, ProgressCounters};
pub use execution_guard::ExecutionGuard;
pub use orchestrator::{CrawlStage, Orchestrator, Transition, next_stage};
pub use termination::{CancelHandle, TerminationSignal};

// Re-export dedup primitives
pub use content_signature::content_signature;
pub use frontier::Frontier;
pub use output::assemble_output;

// Re-export crawl types
pub use crawl_types::{
    CrawlError, EntityRef, FrontierEntry, LinkRef, PageContent, PageMetrics,
    ScrapeSummary, ScrapedPage, ScraperOutput, TerminationReason, ValueMetrics,
};

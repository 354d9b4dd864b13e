//! Shared configuration constants for goalcrawl
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Default page budget: 10 extracted pages
///
/// Goal-directed crawls are small by nature. Ten pages is enough for most
/// "find the pricing / docs / contact details" style goals.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Default maximum crawl depth: 3 levels
///
/// Limits how deep the crawler will follow links from the seed URL.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default iteration cap for the AnalyzeURL → DecideNextAction cycle
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Default wall-clock budget: 5 minutes
pub const DEFAULT_MAX_EXECUTION_TIME_MS: u64 = 300_000;

/// Default stagnation window: 60 seconds without a new page or visit
///
/// A value of 0 disables the stagnation detector.
pub const DEFAULT_DEADLOCK_DETECTION_MS: u64 = 60_000;

/// How often the stagnation detector samples the progress counters
pub const DEFAULT_DEADLOCK_CHECK_INTERVAL_MS: u64 = 5_000;

/// Per-call ceiling for fetch, intelligence and authentication collaborators
pub const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 60;

/// Authentication attempts per URL before the URL is skipped
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 2;

/// Times a single URL may become current before the crawl is considered thrashing
pub const DEFAULT_MAX_URL_REVISITS: u32 = 3;

/// Aggregate completeness above which the sufficiency shortcut may fire
pub const DEFAULT_COMPLETENESS_THRESHOLD: f64 = 0.8;

/// Fraction of `max_pages` that must be extracted before the sufficiency shortcut fires
pub const DEFAULT_SUFFICIENT_PAGE_FRACTION: f64 = 0.5;

/// Extracted pages per `batch-complete` event
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// A URL already visited this many times is skipped at AnalyzeURL
///
/// One visit plus one deliberate retry; the third appearance is a redirect loop.
pub const REDIRECT_LOOP_VISITS: u32 = 2;

/// Consecutive identical iteration snapshots treated as a transition cycle
pub const STALLED_SNAPSHOT_WINDOW: usize = 20;

/// Minimum visited URLs before the "majority revisited" rule applies
pub const MIN_VISITS_FOR_MAJORITY_RULE: usize = 4;

/// Relevance and expected value used when URL analysis fails
pub const FALLBACK_URL_SCORE: f64 = 0.1;

/// Neutral metric value used whenever a score is missing or its collaborator failed
pub const NEUTRAL_METRIC: f64 = 0.5;

/// Query parameters that only carry campaign tracking and never change page content
pub const TRACKING_QUERY_PARAMS: &[&str] = &["utm_source", "utm_medium", "utm_campaign", "fbclid", "gclid"];

/// Trailing index documents collapsed into their directory during normalization
pub const INDEX_DOCUMENTS: &[&str] = &["index.html", "index.htm", "index.php", "index.aspx"];

/// Chrome user agent string used by both fetchers
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

//! Built-in crawl intelligence
//!
//! A keyword-driven stand-in for model-backed scoring. Plug in your own
//! `CrawlIntelligence` when goal understanding needs more than term overlap.

pub mod heuristic;

pub use heuristic::{HeuristicIntelligence, goal_terms, term_coverage};

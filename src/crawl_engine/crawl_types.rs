//! Core types for goal-directed crawling.
//!
//! Error type, frontier entries, per-page records, aggregate value metrics
//! and the final `ScraperOutput` report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::NEUTRAL_METRIC;

/// Custom error type for crawl operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Browser error: {0}")]
    Browser(String),
    #[error("Network error: {0}")]
    Network(String),
}

/// Clamp a score into [0, 1], mapping NaN to 0
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A discovered-but-not-yet-fetched URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontierEntry {
    pub url: String,
    /// Predicted usefulness toward the goal, in [0, 1]
    pub expected_value: f64,
    /// Link hops from the seed URL
    pub depth: u32,
}

impl FrontierEntry {
    #[must_use]
    pub fn new(url: impl Into<String>, expected_value: f64, depth: u32) -> Self {
        Self {
            url: url.into(),
            expected_value: clamp_unit(expected_value),
            depth,
        }
    }
}

/// Aggregate crawl progress, recomputed every cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueMetrics {
    pub information_density: f64,
    pub relevance: f64,
    pub uniqueness: f64,
    pub completeness: f64,
}

impl ValueMetrics {
    /// All four dimensions at 0.5, used when progress evaluation fails
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            information_density: NEUTRAL_METRIC,
            relevance: NEUTRAL_METRIC,
            uniqueness: NEUTRAL_METRIC,
            completeness: NEUTRAL_METRIC,
        }
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            information_density: clamp_unit(self.information_density),
            relevance: clamp_unit(self.relevance),
            uniqueness: clamp_unit(self.uniqueness),
            completeness: clamp_unit(self.completeness),
        }
    }
}

/// Per-page quality scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetrics {
    pub information_density: f64,
    pub relevance: f64,
    pub uniqueness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_quality_analysis: Option<String>,
}

impl PageMetrics {
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            information_density: NEUTRAL_METRIC,
            relevance: NEUTRAL_METRIC,
            uniqueness: NEUTRAL_METRIC,
            content_quality_analysis: None,
        }
    }
}

/// A candidate outgoing link discovered on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    pub url: String,
    /// Anchor text or surrounding text
    pub context: String,
    pub predicted_value: f64,
    /// Whether the URL was already visited when the link was discovered
    pub visited: bool,
}

/// Best-effort entity surfaced during extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentions: Option<u32>,
}

/// Extracted content for one URL, as accumulated during the run
///
/// Optional fields may be missing when a stage was skipped or a
/// collaborator returned a partial result; the output assembler fills them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    #[serde(default)]
    pub extraction_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: Option<PageMetrics>,
    #[serde(default)]
    pub links: Option<Vec<LinkRef>>,
    #[serde(default)]
    pub entities: Option<Vec<EntityRef>>,
}

/// Fully populated page as it appears in the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedPage {
    pub url: String,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub extraction_time: DateTime<Utc>,
    pub metrics: PageMetrics,
    pub links: Vec<LinkRef>,
    pub entities: Vec<EntityRef>,
}

/// Why a run stopped. Exactly one reason wins per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    /// The navigation collaborator decided the goal is complete
    GoalComplete,
    /// Aggregate completeness crossed the sufficiency threshold
    SufficientContent,
    /// `max_pages` pages were extracted
    PageLimit,
    /// No frontier entries remained
    FrontierExhausted,
    /// `max_iterations` cycles were run
    IterationLimit,
    /// Wall-clock budget expired
    Timeout,
    /// Neither extracted nor visited counts moved within the stagnation window
    Deadlock,
    /// The frontier kept returning URLs that were already processed
    CycleDetected,
    /// The caller cancelled the run
    Cancelled,
}

impl TerminationReason {
    /// Whether the run was cut short by a safety net rather than finishing its work
    #[must_use]
    pub fn is_forced(self) -> bool {
        matches!(
            self,
            Self::IterationLimit | Self::Timeout | Self::Deadlock | Self::CycleDetected | Self::Cancelled
        )
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::GoalComplete => "goal complete",
            Self::SufficientContent => "sufficient content extracted",
            Self::PageLimit => "page limit reached",
            Self::FrontierExhausted => "frontier exhausted",
            Self::IterationLimit => "iteration limit reached",
            Self::Timeout => "execution timeout",
            Self::Deadlock => "no progress within the stagnation window",
            Self::CycleDetected => "revisit cycle detected",
            Self::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Summary metrics of a run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeSummary {
    pub pages_scraped: usize,
    /// Sum of extracted content lengths, in bytes
    pub total_content_size: usize,
    /// Wall-clock run time in milliseconds
    pub execution_time: u64,
    pub goal_completion: f64,
    pub coverage_score: f64,
}

/// Terminal artifact of a run. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperOutput {
    pub pages: Vec<ScrapedPage>,
    pub summary: ScrapeSummary,
    pub termination: TerminationReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

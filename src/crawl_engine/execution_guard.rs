//! In-loop safety nets: iteration cap, revisit cycles and the sufficiency shortcut
//!
//! These checks run on the orchestrator loop itself, between stages. The
//! time-based nets (wall-clock timeout, stagnation) live in `watchdog`.

use std::collections::{HashMap, VecDeque};

use log::warn;

use super::crawl_state::CrawlState;
use super::crawl_types::TerminationReason;
use super::orchestrator::CrawlStage;
use crate::config::ScrapeConfig;
use crate::utils::{MIN_VISITS_FOR_MAJORITY_RULE, STALLED_SNAPSHOT_WINDOW};

const EXECUTION_PATH_LIMIT: usize = 64;

/// What the loop looked like at the start of one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
struct IterationSnapshot {
    current_url: Option<String>,
    extracted: usize,
    visited: usize,
    queued: usize,
}

/// Guard bookkeeping carried inside `CrawlState`
#[derive(Debug, Clone, Default)]
pub struct GuardState {
    node_visit_counts: HashMap<CrawlStage, u64>,
    execution_path: VecDeque<CrawlStage>,
    snapshots: VecDeque<IterationSnapshot>,
}

impl GuardState {
    /// How often `stage` has run
    #[must_use]
    pub fn node_visits(&self, stage: CrawlStage) -> u64 {
        self.node_visit_counts.get(&stage).copied().unwrap_or(0)
    }

    /// Most recent stages, oldest first
    #[must_use]
    pub fn execution_path(&self) -> impl Iterator<Item = CrawlStage> + '_ {
        self.execution_path.iter().copied()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionGuard {
    max_iterations: u32,
    max_url_revisits: u32,
    completeness_threshold: f64,
    sufficient_pages: usize,
}

impl ExecutionGuard {
    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        let sufficient_pages =
            (config.max_pages() as f64 * config.sufficient_page_fraction()).ceil() as usize;
        Self {
            max_iterations: config.max_iterations(),
            max_url_revisits: config.max_url_revisits(),
            completeness_threshold: config.completeness_threshold(),
            sufficient_pages: sufficient_pages.max(1),
        }
    }

    pub fn record_stage(&self, state: &mut CrawlState, stage: CrawlStage) {
        let guard = &mut state.guard;
        *guard.node_visit_counts.entry(stage).or_insert(0) += 1;
        guard.execution_path.push_back(stage);
        if guard.execution_path.len() > EXECUTION_PATH_LIMIT {
            guard.execution_path.pop_front();
        }
    }

    /// Count a new pass through the pipeline and check the loop-level limits.
    ///
    /// Called before every `AnalyzeUrl` stage.
    pub fn begin_iteration(&self, state: &mut CrawlState) -> Option<TerminationReason> {
        state.iterations += 1;
        if state.iterations > self.max_iterations {
            warn!(
                target: "goalcrawl::guard",
                "Iteration cap of {} reached",
                self.max_iterations
            );
            return Some(TerminationReason::IterationLimit);
        }

        if let Some(url) = state.current_url() {
            let dequeued = state.dequeue_count(url);
            if dequeued > self.max_url_revisits {
                warn!(
                    target: "goalcrawl::guard",
                    "{url} became current {dequeued} times, frontier is thrashing"
                );
                return Some(TerminationReason::CycleDetected);
            }
        }

        let visited = state.visited_urls().len();
        if visited >= MIN_VISITS_FOR_MAJORITY_RULE {
            let revisited = state.visit_counts.values().filter(|&&count| count > 1).count();
            if revisited * 2 > visited {
                warn!(
                    target: "goalcrawl::guard",
                    "{revisited} of {visited} visited URLs were visited more than once"
                );
                return Some(TerminationReason::CycleDetected);
            }
        }

        let snapshot = IterationSnapshot {
            current_url: state.current_url.clone(),
            extracted: state.extracted_count(),
            visited,
            queued: state.queue_size(),
        };
        let snapshots = &mut state.guard.snapshots;
        snapshots.push_back(snapshot);
        if snapshots.len() > STALLED_SNAPSHOT_WINDOW {
            snapshots.pop_front();
        }
        if snapshots.len() == STALLED_SNAPSHOT_WINDOW
            && snapshots.iter().all(|s| Some(s) == snapshots.front())
        {
            warn!(
                target: "goalcrawl::guard",
                "{STALLED_SNAPSHOT_WINDOW} identical iterations in a row"
            );
            return Some(TerminationReason::CycleDetected);
        }

        None
    }

    /// Whether enough signal has been gathered to stop early
    #[must_use]
    pub fn is_sufficient(&self, state: &CrawlState) -> bool {
        state.value_metrics().completeness > self.completeness_threshold
            && state.extracted_count() >= self.sufficient_pages
    }
}

//! Run driver
//!
//! `GoalCrawler::run` owns the crawl state, drives the orchestrator stage by
//! stage and races it against the termination signal. Whatever wins, the
//! output assembler runs exactly once on the state as it stands.

use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use super::collaborators::{CrawlHooks, CrawlIntelligence, PageFetcher};
use super::crawl_state::CrawlState;
use super::crawl_types::{ScraperOutput, TerminationReason};
use super::orchestrator::{CrawlStage, Orchestrator};
use super::output::assemble_output;
use super::termination::{CancelHandle, TerminationSignal};
use super::watchdog::Watchdogs;
use crate::config::ScrapeConfig;
use crate::crawl_events::{ScrapeEvent, ShutdownReason};

const LOG_TARGET: &str = "goalcrawl::orchestrator";

/// A single goal-directed crawl run
///
/// Each crawler owns its state, so any number may run concurrently.
///
/// ```rust,ignore
/// let crawler = GoalCrawler::new(config, fetcher, intelligence);
/// let cancel = crawler.cancel_handle();
/// let output = crawler.run().await;
/// ```
#[derive(Debug)]
pub struct GoalCrawler {
    orchestrator: Orchestrator,
    signal: TerminationSignal,
}

impl GoalCrawler {
    #[must_use]
    pub fn new(
        config: ScrapeConfig,
        fetcher: Arc<dyn PageFetcher>,
        intelligence: Arc<dyn CrawlIntelligence>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(config, fetcher, intelligence),
            signal: TerminationSignal::new(),
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: CrawlHooks) -> Self {
        self.orchestrator.set_hooks(hooks);
        self
    }

    /// Handle that cancels this run from another task
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.signal.clone())
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        self.orchestrator.config()
    }

    /// Crawl until a termination condition wins and return the report.
    ///
    /// Never fails: collaborator errors are absorbed during the run and the
    /// report is assembled from whatever was extracted.
    pub async fn run(self) -> ScraperOutput {
        let started = Instant::now();
        let config = self.orchestrator.config();
        let mut state = CrawlState::new(config.base_url(), config.scraping_goal());

        info!(
            target: LOG_TARGET,
            "Starting crawl of {} (max_pages={}, max_depth={}, goal={:?})",
            config.base_url(),
            config.max_pages(),
            config.max_depth(),
            config.scraping_goal()
        );

        let watchdogs = Watchdogs::arm(&self.signal, state.counters(), config);
        self.drive(&mut state).await;
        drop(watchdogs);

        if let Some(reason) = state.finish_reason {
            self.signal.trigger(reason);
        }
        let termination = self
            .signal
            .reason()
            .unwrap_or(TerminationReason::FrontierExhausted);

        if termination.is_forced() {
            warn!(target: LOG_TARGET, "Crawl stopped early: {termination}");
            self.orchestrator
                .emit(ScrapeEvent::error(format!("crawl stopped early: {termination}")))
                .await;
        }

        let mut output = assemble_output(&state, termination);
        output.summary.execution_time = started.elapsed().as_millis() as u64;

        self.finish_events(&state, &output).await;

        info!(
            target: LOG_TARGET,
            "Crawl finished ({termination}): {} pages, {} bytes in {}ms",
            output.summary.pages_scraped,
            output.summary.total_content_size,
            output.summary.execution_time
        );
        output
    }

    async fn drive(&self, state: &mut CrawlState) {
        let guard = self.orchestrator.guard();
        let mut stage = CrawlStage::AnalyzeUrl;

        while stage != CrawlStage::Complete {
            if stage == CrawlStage::AnalyzeUrl
                && let Some(reason) = guard.begin_iteration(state)
            {
                self.signal.trigger(reason);
                return;
            }
            guard.record_stage(state, stage);

            tokio::select! {
                biased;
                reason = self.signal.wait() => {
                    info!(target: LOG_TARGET, "Interrupted during {stage}: {reason}");
                    return;
                }
                next = self.orchestrator.step(stage, state) => stage = next,
            }
        }
    }

    async fn finish_events(&self, state: &CrawlState, output: &ScraperOutput) {
        if state.batch_pending > 0 {
            self.orchestrator
                .emit(ScrapeEvent::BatchComplete {
                    processed_in_batch: state.batch_pending,
                    extracted_total: output.summary.pages_scraped,
                })
                .await;
        }

        let summary = &output.summary;
        self.orchestrator
            .emit(ScrapeEvent::ScrapingComplete {
                pages_scraped: summary.pages_scraped,
                total_content_size: summary.total_content_size,
                execution_time_ms: summary.execution_time,
                goal_completion: summary.goal_completion,
                coverage_score: summary.coverage_score,
            })
            .await;

        if let Some(bus) = self.orchestrator.config().event_bus() {
            let reason = if output.termination == TerminationReason::Cancelled {
                ShutdownReason::Cancelled
            } else {
                ShutdownReason::ScrapeCompleted
            };
            bus.shutdown_gracefully(reason).await;
        }
    }
}

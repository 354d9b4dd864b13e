//! Crawl state machine
//!
//! One URL flows through the pipeline at a time:
//! `AnalyzeUrl → FetchPage → DetectAuthentication → [HandleAuthentication →]
//! ExtractContent → DiscoverLinks → EvaluateProgress → DecideNextAction`,
//! then back to `AnalyzeUrl` or on to `Complete`.
//!
//! Each stage handler returns a [`Transition`]; [`next_stage`] maps the
//! `(stage, transition)` pair onto the following stage. Collaborator failures
//! are absorbed at the call site and replaced with conservative fallbacks, so
//! a handler never fails.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use super::collaborator_timeout::with_collaborator_timeout;
use super::collaborators::{
    AuthRequest, CrawlHooks, CrawlIntelligence, FetchOptions, NavigationAction, PageFetcher,
    UrlAnalysis,
};
use super::content_signature::content_signature;
use super::crawl_state::CrawlState;
use super::crawl_types::{
    FrontierEntry, LinkRef, PageContent, PageMetrics, TerminationReason, ValueMetrics,
    clamp_unit,
};
use super::execution_guard::ExecutionGuard;
use crate::config::ScrapeConfig;
use crate::crawl_events::{ScrapeEvent, ScrapeEventBus};
use crate::utils::{REDIRECT_LOOP_VISITS, normalize_url, resolve_link};

const LOG_TARGET: &str = "goalcrawl::orchestrator";

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStage {
    AnalyzeUrl,
    FetchPage,
    DetectAuthentication,
    HandleAuthentication,
    ExtractContent,
    DiscoverLinks,
    EvaluateProgress,
    DecideNextAction,
    Complete,
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AnalyzeUrl => "analyze_url",
            Self::FetchPage => "fetch_page",
            Self::DetectAuthentication => "detect_authentication",
            Self::HandleAuthentication => "handle_authentication",
            Self::ExtractContent => "extract_content",
            Self::DiscoverLinks => "discover_links",
            Self::EvaluateProgress => "evaluate_progress",
            Self::DecideNextAction => "decide_next_action",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Outcome of a stage handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Follow the default edge
    Next,
    /// Authentication is required for the current page
    Authenticate,
    /// The current URL was dropped and the next frontier entry is current
    Skip,
    /// Run the current URL through the pipeline again
    Restart,
    /// Stop the run
    Finish(TerminationReason),
}

/// Transition table of the state machine
#[must_use]
pub fn next_stage(stage: CrawlStage, transition: Transition) -> CrawlStage {
    use CrawlStage as S;

    match (stage, transition) {
        (_, Transition::Finish(_)) | (S::Complete, _) => S::Complete,
        (_, Transition::Skip | Transition::Restart) => S::AnalyzeUrl,
        (S::DetectAuthentication, Transition::Authenticate) => S::HandleAuthentication,
        (S::AnalyzeUrl, _) => S::FetchPage,
        (S::FetchPage, _) => S::DetectAuthentication,
        (S::DetectAuthentication | S::HandleAuthentication, _) => S::ExtractContent,
        (S::ExtractContent, _) => S::DiscoverLinks,
        (S::DiscoverLinks, _) => S::EvaluateProgress,
        (S::EvaluateProgress, _) => S::DecideNextAction,
        (S::DecideNextAction, _) => S::AnalyzeUrl,
    }
}

/// Drives one crawl's stages against the configured collaborators
pub struct Orchestrator {
    config: ScrapeConfig,
    fetcher: Arc<dyn PageFetcher>,
    intelligence: Arc<dyn CrawlIntelligence>,
    hooks: CrawlHooks,
    guard: ExecutionGuard,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        config: ScrapeConfig,
        fetcher: Arc<dyn PageFetcher>,
        intelligence: Arc<dyn CrawlIntelligence>,
    ) -> Self {
        let guard = ExecutionGuard::from_config(&config);
        Self {
            config,
            fetcher,
            intelligence,
            hooks: CrawlHooks::default(),
            guard,
        }
    }

    pub(crate) fn set_hooks(&mut self, hooks: CrawlHooks) {
        self.hooks = hooks;
    }

    #[must_use]
    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    #[must_use]
    pub fn guard(&self) -> &ExecutionGuard {
        &self.guard
    }

    /// Run `stage` and return the stage that follows it.
    ///
    /// A `Finish` transition is recorded in `state.finish_reason`; the first
    /// recorded reason is kept.
    pub async fn step(&self, stage: CrawlStage, state: &mut CrawlState) -> CrawlStage {
        let transition = match stage {
            CrawlStage::AnalyzeUrl => self.analyze_url(state).await,
            CrawlStage::FetchPage => self.fetch_page(state).await,
            CrawlStage::DetectAuthentication => self.detect_authentication(state).await,
            CrawlStage::HandleAuthentication => self.handle_authentication(state).await,
            CrawlStage::ExtractContent => self.extract_content(state).await,
            CrawlStage::DiscoverLinks => self.discover_links(state).await,
            CrawlStage::EvaluateProgress => self.evaluate_progress(state).await,
            CrawlStage::DecideNextAction => self.decide_next_action(state).await,
            CrawlStage::Complete => return CrawlStage::Complete,
        };

        if let Transition::Finish(reason) = transition
            && state.finish_reason.is_none()
        {
            state.finish_reason = Some(reason);
        }
        let next = next_stage(stage, transition);
        debug!(target: LOG_TARGET, "{stage} -> {next} ({transition:?})");
        next
    }

    /// Publish to the configured event bus, ignoring delivery failures
    pub(crate) async fn emit(&self, event: ScrapeEvent) {
        if let Some(bus) = self.config.event_bus() {
            publish(bus, event).await;
        }
    }

    async fn call<T>(
        &self,
        name: &str,
        operation: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        with_collaborator_timeout(operation, self.config.collaborator_timeout_secs(), name).await
    }

    /// Drop the current URL and move to the next frontier entry
    fn skip(state: &mut CrawlState) -> Transition {
        if state.advance() {
            Transition::Skip
        } else {
            Transition::Finish(TerminationReason::FrontierExhausted)
        }
    }

    async fn record_failure(&self, state: &mut CrawlState, message: String) {
        state.last_error = Some(message.clone());
        self.emit(ScrapeEvent::error(message)).await;
    }

    // ------------------------------------------------------------------------
    // Stage handlers
    // ------------------------------------------------------------------------

    async fn analyze_url(&self, state: &mut CrawlState) -> Transition {
        if state.current_url.is_none() && !state.advance() {
            info!(target: LOG_TARGET, "Frontier is empty, nothing left to analyze");
            return Transition::Finish(TerminationReason::FrontierExhausted);
        }
        let Some(url) = state.current_url.clone() else {
            return Transition::Finish(TerminationReason::FrontierExhausted);
        };

        if state.visit_count(&url) >= REDIRECT_LOOP_VISITS {
            warn!(target: LOG_TARGET, "Skipping {url}: already visited {} times", state.visit_count(&url));
            return Self::skip(state);
        }

        self.emit(ScrapeEvent::url_processing(&url, state.current_depth))
            .await;

        let analysis = match self
            .call(
                "analyze_url",
                self.intelligence
                    .analyze_url(&url, self.config.scraping_goal(), state),
            )
            .await
        {
            Ok(analysis) => analysis.clamped(),
            Err(e) => {
                warn!(target: LOG_TARGET, "URL analysis failed for {url}, using fallback score: {e:#}");
                UrlAnalysis::fallback()
            }
        };

        if !analysis.is_allowed_by_robots {
            info!(target: LOG_TARGET, "Skipping {url}: disallowed by robots rules");
            return Self::skip(state);
        }

        debug!(
            target: LOG_TARGET,
            "Analyzed {url}: relevance={:.2} expected_value={:.2}",
            analysis.relevance_score,
            analysis.expected_value
        );
        state.page.analysis = Some(analysis);
        Transition::Next
    }

    async fn fetch_page(&self, state: &mut CrawlState) -> Transition {
        let Some(url) = state.current_url.clone() else {
            return Self::skip(state);
        };
        let key = normalize_url(&url);
        let dedup = self.config.prevent_duplicate_urls();

        if dedup && state.is_known_key(&key) {
            info!(target: LOG_TARGET, "Skipping {url}: {key} was already fetched");
            return Self::skip(state);
        }

        let execute_javascript = self.config.execute_javascript();
        self.emit(ScrapeEvent::fetch_started(&url, execute_javascript))
            .await;

        let fetched = self
            .call(
                "fetch",
                self.fetcher.fetch(&url, FetchOptions { execute_javascript }),
            )
            .await;

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                warn!(target: LOG_TARGET, "Fetch failed for {url}: {e:#}");
                self.record_failure(state, format!("fetch failed for {url}: {e:#}"))
                    .await;
                return Transition::Next;
            }
        };

        if let Some(error) = &response.error {
            warn!(target: LOG_TARGET, "Fetch reported an error for {url}: {error}");
            self.record_failure(state, format!("fetch failed for {url}: {error}"))
                .await;
        }

        state.record_key(key.clone());

        if dedup && !response.html.is_empty() {
            let signature = content_signature(&response.html);
            if !signature.is_empty() && !state.record_signature(&key, signature) {
                info!(target: LOG_TARGET, "Skipping {url}: content duplicates an earlier page");
                state.mark_visited(&url);
                return Self::skip(state);
            }
        }

        self.emit(ScrapeEvent::fetch_completed(&url, response.html.len()))
            .await;

        state.page.status = Some(response.status);
        state.page.final_url = Some(response.final_url).filter(|u| !u.is_empty());
        state.page.html = Some(response.html).filter(|html| !html.is_empty());
        Transition::Next
    }

    async fn detect_authentication(&self, state: &mut CrawlState) -> Transition {
        let (Some(url), Some(html)) = (state.current_url.clone(), state.page.html.as_deref())
        else {
            state.page.requires_auth = false;
            return Transition::Next;
        };
        let status = state.page.status.unwrap_or(0);

        let detection = self
            .call(
                "detect_authentication",
                self.intelligence.detect_authentication(html, &url, status),
            )
            .await;

        match detection {
            Ok(detection) if detection.requires_authentication => {
                info!(target: LOG_TARGET, "{url} requires authentication");
                state.page.requires_auth = true;
                state.page.auth_request =
                    Some(detection.auth_request.unwrap_or_else(|| AuthRequest::for_url(&url)));
                Transition::Authenticate
            }
            Ok(_) => {
                state.page.requires_auth = false;
                Transition::Next
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Authentication detection failed for {url}, assuming none: {e:#}");
                state.page.requires_auth = false;
                Transition::Next
            }
        }
    }

    async fn handle_authentication(&self, state: &mut CrawlState) -> Transition {
        let Some(url) = state.current_url.clone() else {
            return Self::skip(state);
        };

        let max_attempts = self.config.max_auth_attempts();
        if state.auth_attempts(&url) >= max_attempts {
            warn!(target: LOG_TARGET, "Skipping {url}: {max_attempts} authentication attempts exhausted");
            state.mark_visited(&url);
            return Self::skip(state);
        }
        let attempt = state.increment_auth_attempts(&url);

        let Some(handler) = self.hooks.auth_handler.clone() else {
            info!(target: LOG_TARGET, "Skipping {url}: authentication required and no handler configured");
            state.mark_visited(&url);
            return Self::skip(state);
        };

        let request = state
            .page
            .auth_request
            .clone()
            .unwrap_or_else(|| AuthRequest::for_url(&url));

        let resolved = self
            .call("on_auth_required", async {
                Ok(handler.on_auth_required(&request).await)
            })
            .await;

        match resolved {
            Ok(true) => {
                info!(target: LOG_TARGET, "Authenticated {url} on attempt {attempt}, fetching again");
                state.forget_fetch(&url);
                state.restart_current();
                Transition::Restart
            }
            Ok(false) => {
                warn!(target: LOG_TARGET, "Authentication declined for {url}, skipping");
                state.mark_visited(&url);
                Self::skip(state)
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Authentication handler failed for {url}: {e:#}");
                self.record_failure(state, format!("authentication failed for {url}: {e:#}"))
                    .await;
                state.mark_visited(&url);
                Self::skip(state)
            }
        }
    }

    async fn extract_content(&self, state: &mut CrawlState) -> Transition {
        if state.page.requires_auth {
            return Transition::Next;
        }
        let (Some(url), Some(html)) = (state.current_url.clone(), state.page.html.as_deref())
        else {
            debug!(target: LOG_TARGET, "No HTML for the current page, nothing to extract");
            return Transition::Next;
        };
        if state.extracted_count() >= self.config.max_pages() {
            debug!(target: LOG_TARGET, "Page budget spent, not extracting {url}");
            return Transition::Next;
        }

        let extracted = self
            .call(
                "extract_content",
                self.intelligence.extract_content(html, &url, state),
            )
            .await;

        let extracted = match extracted {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(target: LOG_TARGET, "Content extraction failed for {url}, moving on: {e:#}");
                self.record_failure(state, format!("extraction failed for {url}: {e:#}"))
                    .await;
                state.mark_visited(&url);
                return Self::skip(state);
            }
        };

        let mut metrics = extracted.metrics;
        metrics.information_density = clamp_unit(metrics.information_density);
        metrics.relevance = clamp_unit(metrics.relevance);
        metrics.uniqueness = clamp_unit(metrics.uniqueness);

        let page = PageContent {
            url: url.clone(),
            title: extracted.title,
            content: extracted.content,
            content_type: extracted.content_type,
            extraction_time: Some(Utc::now()),
            metrics: Some(metrics),
            links: None,
            entities: Some(extracted.entities),
        };

        if !state.record_page(page.clone()) {
            debug!(target: LOG_TARGET, "{url} was already extracted, keeping the earlier page");
            return Transition::Next;
        }
        state.page.extracted = true;
        state.batch_pending += 1;
        self.emit(ScrapeEvent::UrlExtract { url: url.clone() }).await;

        if let Some(callback) = self.hooks.page_callback.clone()
            && let Err(e) = self
                .call("on_page_processed", callback.on_page_processed(&page))
                .await
        {
            warn!(target: LOG_TARGET, "Page callback failed for {url}: {e:#}");
        }

        Transition::Next
    }

    async fn discover_links(&self, state: &mut CrawlState) -> Transition {
        if state.page.requires_auth {
            return Transition::Next;
        }
        let (Some(url), Some(html)) = (state.current_url.clone(), state.page.html.as_deref())
        else {
            return Transition::Next;
        };

        let discovered = self
            .call(
                "discover_links",
                self.intelligence.discover_links(html, &url, state),
            )
            .await;

        let discovered = match discovered {
            Ok(links) => links,
            Err(e) => {
                warn!(target: LOG_TARGET, "Link discovery failed for {url}: {e:#}");
                state.last_error = Some(format!("link discovery failed for {url}: {e:#}"));
                return Transition::Next;
            }
        };

        let base = state.page.final_url.clone().unwrap_or_else(|| url.clone());
        let next_depth = state.current_depth + 1;
        let dedup = self.config.prevent_duplicate_urls();
        let filters = self.config.filters();

        let mut refs = Vec::with_capacity(discovered.len());
        let mut enqueued = 0usize;
        for link in discovered {
            let Some(resolved) = resolve_link(&base, &link.url) else {
                continue;
            };
            let key = normalize_url(&resolved);
            let exact_visited = state.is_visited(&resolved);
            let predicted_value = clamp_unit(link.predicted_value);
            refs.push(LinkRef {
                url: resolved.clone(),
                context: link.context,
                predicted_value,
                visited: exact_visited || state.is_known_key(&key),
            });

            if exact_visited
                || next_depth > self.config.max_depth()
                || !filters.allows(&resolved)
                || (dedup && (state.is_known_key(&key) || state.page_queue.contains_key(&key)))
            {
                continue;
            }
            state
                .page_queue
                .push(FrontierEntry::new(resolved, predicted_value, next_depth));
            enqueued += 1;
        }

        debug!(
            target: LOG_TARGET,
            "Discovered {} links on {url}, enqueued {enqueued} at depth {next_depth}",
            refs.len()
        );
        self.emit(ScrapeEvent::UrlLinks {
            url: url.clone(),
            link_count: refs.len(),
        })
        .await;
        if state.page.extracted && !state.attach_links(&url, refs) {
            debug!(target: LOG_TARGET, "{url} already has links recorded, keeping them");
        }
        Transition::Next
    }

    async fn evaluate_progress(&self, state: &mut CrawlState) -> Transition {
        let evaluated = self
            .call("evaluate_progress", self.intelligence.evaluate_progress(state))
            .await;

        state.value_metrics = match evaluated {
            Ok(metrics) => metrics.clamped(),
            Err(e) => {
                warn!(target: LOG_TARGET, "Progress evaluation failed, using neutral metrics: {e:#}");
                ValueMetrics::neutral()
            }
        };
        Transition::Next
    }

    async fn decide_next_action(&self, state: &mut CrawlState) -> Transition {
        if let Some(url) = state.current_url.clone() {
            state.mark_visited(&url);
            if state.page.extracted {
                self.report_page_complete(state, &url).await;
            }
        }

        let transition = self.choose_next(state).await;

        self.emit(ScrapeEvent::Progress {
            pages_scraped: state.extracted_count(),
            queue_size: state.queue_size(),
            goal_completion: state.value_metrics.completeness,
        })
        .await;

        transition
    }

    async fn choose_next(&self, state: &mut CrawlState) -> Transition {
        if state.extracted_count() >= self.config.max_pages() {
            info!(target: LOG_TARGET, "Extracted {} pages, page budget reached", state.extracted_count());
            return Transition::Finish(TerminationReason::PageLimit);
        }
        if self.guard.is_sufficient(state) {
            info!(
                target: LOG_TARGET,
                "Completeness {:.2} with {} pages is sufficient, finishing early",
                state.value_metrics.completeness,
                state.extracted_count()
            );
            return Transition::Finish(TerminationReason::SufficientContent);
        }

        let metrics = state.value_metrics;
        let decision = self
            .call(
                "decide_next_action",
                self.intelligence.decide_next_action(state, &metrics),
            )
            .await;

        match decision {
            Ok(decision) if decision.action == NavigationAction::Complete => {
                info!(target: LOG_TARGET, "Navigator finished the crawl: {}", decision.reason);
                return Transition::Finish(TerminationReason::GoalComplete);
            }
            Ok(decision) => {
                debug!(target: LOG_TARGET, "Continuing: {}", decision.reason);
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Navigation decision failed, continuing with the frontier: {e:#}");
            }
        }

        if state.advance() {
            Transition::Next
        } else {
            info!(target: LOG_TARGET, "Frontier exhausted");
            Transition::Finish(TerminationReason::FrontierExhausted)
        }
    }

    async fn report_page_complete(&self, state: &mut CrawlState, url: &str) {
        if let Some(page) = state.extracted_page(url) {
            let event = ScrapeEvent::UrlComplete {
                url: url.to_string(),
                title: page.title.clone(),
                metrics: page.metrics.clone().unwrap_or_else(PageMetrics::neutral),
                link_count: page.links.as_ref().map_or(0, Vec::len),
                content_length: page.content.len(),
                processing_time_ms: state.page.started_at.elapsed().as_millis() as u64,
            };
            self.emit(event).await;
        }

        let batch_size = self.config.batch_size();
        if state.batch_pending >= batch_size {
            state.batch_pending = 0;
            self.emit(ScrapeEvent::BatchComplete {
                processed_in_batch: batch_size,
                extracted_total: state.extracted_count(),
            })
            .await;
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

pub(crate) async fn publish(bus: &ScrapeEventBus, event: ScrapeEvent) {
    let kind = event.kind();
    if let Err(e) = bus.publish(event).await {
        debug!(target: LOG_TARGET, "Event {kind} not delivered: {e}");
    }
}

//! Mutable crawl record threaded through every orchestrator stage
//!
//! The orchestrator loop is the only writer. Watchdog tasks observe progress
//! through the shared [`ProgressCounters`], never through the collections.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use super::collaborators::{AuthRequest, UrlAnalysis};
use super::crawl_types::{FrontierEntry, LinkRef, PageContent, TerminationReason, ValueMetrics};
use super::execution_guard::GuardState;
use super::frontier::Frontier;
use crate::utils::normalize_url;

/// Lock-free progress counters shared with the watchdog tasks
#[derive(Debug, Default)]
pub struct ProgressCounters {
    extracted: AtomicUsize,
    visited: AtomicUsize,
}

impl ProgressCounters {
    #[must_use]
    pub fn extracted(&self) -> usize {
        self.extracted.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::Acquire)
    }

    /// Both counters as one pair, for stagnation comparisons
    #[must_use]
    pub fn snapshot(&self) -> (usize, usize) {
        (self.extracted(), self.visited())
    }

    fn set_extracted(&self, value: usize) {
        self.extracted.store(value, Ordering::Release);
    }

    fn set_visited(&self, value: usize) {
        self.visited.store(value, Ordering::Release);
    }
}

/// Scratch data for the URL currently moving through the pipeline
#[derive(Debug, Clone)]
pub struct PageContext {
    pub html: Option<String>,
    pub status: Option<u16>,
    pub final_url: Option<String>,
    pub analysis: Option<UrlAnalysis>,
    pub requires_auth: bool,
    pub auth_request: Option<AuthRequest>,
    /// Set when this pass stored a new `PageContent`
    pub extracted: bool,
    pub started_at: Instant,
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            html: None,
            status: None,
            final_url: None,
            analysis: None,
            requires_auth: false,
            auth_request: None,
            extracted: false,
            started_at: Instant::now(),
        }
    }
}

/// Long-lived state of a single crawl run
#[derive(Debug)]
pub struct CrawlState {
    pub(crate) goal: String,
    pub(crate) current_url: Option<String>,
    pub(crate) current_depth: u32,
    pub(crate) visited_urls: HashSet<String>,
    /// Times each exact URL has been marked visited
    pub(crate) visit_counts: HashMap<String, u32>,
    /// Times each exact URL has become the current URL
    pub(crate) dequeue_counts: HashMap<String, u32>,
    pub(crate) normalized_urls: HashSet<String>,
    pub(crate) content_signatures: HashSet<String>,
    /// Signature recorded for each normalized key, so it can be forgotten again
    pub(crate) signature_by_key: HashMap<String, String>,
    pub(crate) page_queue: Frontier,
    pub(crate) extracted: Vec<PageContent>,
    pub(crate) extracted_index: HashMap<String, usize>,
    pub(crate) auth_attempts: HashMap<String, u32>,
    pub(crate) value_metrics: ValueMetrics,
    pub(crate) page: PageContext,
    pub(crate) last_error: Option<String>,
    pub(crate) iterations: u32,
    /// Extracted pages not yet reported in a `batch-complete` event
    pub(crate) batch_pending: usize,
    pub(crate) finish_reason: Option<TerminationReason>,
    pub(crate) guard: GuardState,
    counters: Arc<ProgressCounters>,
}

impl CrawlState {
    /// Fresh state whose frontier holds only the seed URL at depth 0
    #[must_use]
    pub fn new(seed_url: &str, goal: &str) -> Self {
        let mut page_queue = Frontier::new();
        page_queue.push(FrontierEntry::new(seed_url, 1.0, 0));
        Self {
            goal: goal.to_string(),
            current_url: None,
            current_depth: 0,
            visited_urls: HashSet::new(),
            visit_counts: HashMap::new(),
            dequeue_counts: HashMap::new(),
            normalized_urls: HashSet::new(),
            content_signatures: HashSet::new(),
            signature_by_key: HashMap::new(),
            page_queue,
            extracted: Vec::new(),
            extracted_index: HashMap::new(),
            auth_attempts: HashMap::new(),
            value_metrics: ValueMetrics::default(),
            page: PageContext::default(),
            last_error: None,
            iterations: 0,
            batch_pending: 0,
            finish_reason: None,
            guard: GuardState::default(),
            counters: Arc::new(ProgressCounters::default()),
        }
    }

    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    #[must_use]
    pub fn current_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    #[must_use]
    pub fn current_depth(&self) -> u32 {
        self.current_depth
    }

    #[must_use]
    pub fn visited_urls(&self) -> &HashSet<String> {
        &self.visited_urls
    }

    #[must_use]
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_urls.contains(url)
    }

    #[must_use]
    pub fn visit_count(&self, url: &str) -> u32 {
        self.visit_counts.get(url).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn dequeue_count(&self, url: &str) -> u32 {
        self.dequeue_counts.get(url).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn normalized_urls(&self) -> &HashSet<String> {
        &self.normalized_urls
    }

    #[must_use]
    pub fn is_known_key(&self, normalized: &str) -> bool {
        self.normalized_urls.contains(normalized)
    }

    #[must_use]
    pub fn content_signatures(&self) -> &HashSet<String> {
        &self.content_signatures
    }

    #[must_use]
    pub fn frontier(&self) -> &Frontier {
        &self.page_queue
    }

    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.page_queue.len()
    }

    /// Extracted pages in insertion order
    #[must_use]
    pub fn extracted_pages(&self) -> &[PageContent] {
        &self.extracted
    }

    #[must_use]
    pub fn extracted_count(&self) -> usize {
        self.extracted.len()
    }

    #[must_use]
    pub fn extracted_page(&self, url: &str) -> Option<&PageContent> {
        self.extracted_index.get(url).map(|&idx| &self.extracted[idx])
    }

    #[must_use]
    pub fn total_content_size(&self) -> usize {
        self.extracted.iter().map(|page| page.content.len()).sum()
    }

    #[must_use]
    pub fn auth_attempts(&self, url: &str) -> u32 {
        self.auth_attempts.get(url).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn value_metrics(&self) -> ValueMetrics {
        self.value_metrics
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[must_use]
    pub fn counters(&self) -> Arc<ProgressCounters> {
        Arc::clone(&self.counters)
    }

    /// Dequeue the next frontier entry and make it current.
    ///
    /// Returns `false` and clears the current URL when the frontier is empty.
    pub(crate) fn advance(&mut self) -> bool {
        self.page = PageContext::default();
        match self.page_queue.dequeue() {
            Some(entry) => {
                *self.dequeue_counts.entry(entry.url.clone()).or_insert(0) += 1;
                self.current_url = Some(entry.url);
                self.current_depth = entry.depth;
                true
            }
            None => {
                self.current_url = None;
                false
            }
        }
    }

    /// Start the current URL's pipeline over, e.g. after authenticating
    pub(crate) fn restart_current(&mut self) {
        self.page = PageContext::default();
    }

    pub(crate) fn mark_visited(&mut self, url: &str) {
        self.visited_urls.insert(url.to_string());
        *self.visit_counts.entry(url.to_string()).or_insert(0) += 1;
        self.counters.set_visited(self.visited_urls.len());
    }

    pub(crate) fn record_key(&mut self, normalized: String) {
        self.normalized_urls.insert(normalized);
    }

    /// Record `signature` for `normalized`.
    ///
    /// Returns `false` when another page already produced the same signature.
    pub(crate) fn record_signature(&mut self, normalized: &str, signature: String) -> bool {
        if !self.content_signatures.insert(signature.clone()) {
            return false;
        }
        self.signature_by_key.insert(normalized.to_string(), signature);
        true
    }

    /// Forget the dedup key and signature recorded for `url` so it can be fetched again
    pub(crate) fn forget_fetch(&mut self, url: &str) {
        let key = normalize_url(url);
        if let Some(signature) = self.signature_by_key.remove(&key) {
            self.content_signatures.remove(&signature);
        }
        self.normalized_urls.remove(&key);
    }

    pub(crate) fn increment_auth_attempts(&mut self, url: &str) -> u32 {
        let attempts = self.auth_attempts.entry(url.to_string()).or_insert(0);
        *attempts += 1;
        *attempts
    }

    /// Store a newly extracted page. The first page stored for a URL wins.
    pub(crate) fn record_page(&mut self, page: PageContent) -> bool {
        if self.extracted_index.contains_key(&page.url) {
            return false;
        }
        self.extracted_index.insert(page.url.clone(), self.extracted.len());
        self.extracted.push(page);
        self.counters.set_extracted(self.extracted.len());
        true
    }

    /// Attach links to an extracted page that has none yet
    ///
    /// Extracted pages are append-only: a later pass over the same URL never
    /// replaces what the first pass recorded.
    pub(crate) fn attach_links(&mut self, url: &str, links: Vec<LinkRef>) -> bool {
        match self.extracted_index.get(url) {
            Some(&idx) if self.extracted[idx].links.is_none() => {
                self.extracted[idx].links = Some(links);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_the_only_frontier_entry() {
        let mut state = CrawlState::new("https://x.test/", "goal");
        assert_eq!(state.queue_size(), 1);
        assert!(state.advance());
        assert_eq!(state.current_url(), Some("https://x.test/"));
        assert_eq!(state.current_depth(), 0);
        assert_eq!(state.dequeue_count("https://x.test/"), 1);
        assert!(!state.advance());
        assert_eq!(state.current_url(), None);
    }

    #[test]
    fn forgetting_a_fetch_releases_key_and_signature() {
        let mut state = CrawlState::new("https://x.test/", "goal");
        let key = normalize_url("https://x.test/login");
        state.record_key(key.clone());
        assert!(state.record_signature(&key, "abc".into()));
        assert!(!state.record_signature("https://x.test/other", "abc".into()));

        state.forget_fetch("https://x.test/login/");
        assert!(!state.is_known_key(&key));
        assert!(state.content_signatures().is_empty());
    }

    #[test]
    fn counters_follow_visits_and_pages() {
        let mut state = CrawlState::new("https://x.test/", "goal");
        let counters = state.counters();
        state.mark_visited("https://x.test/");
        state.mark_visited("https://x.test/");
        assert_eq!(state.visit_count("https://x.test/"), 2);
        assert_eq!(counters.snapshot(), (0, 1));

        let page = PageContent {
            url: "https://x.test/".into(),
            title: "Home".into(),
            content: "hello".into(),
            content_type: "text/html".into(),
            extraction_time: None,
            metrics: None,
            links: None,
            entities: None,
        };
        assert!(state.record_page(page.clone()));
        assert!(!state.record_page(page));
        assert_eq!(counters.extracted(), 1);
        assert_eq!(state.total_content_size(), 5);
    }

    #[test]
    fn links_are_recorded_once_per_page() {
        let mut state = CrawlState::new("https://x.test/", "goal");
        let link = |url: &str| LinkRef {
            url: url.into(),
            context: String::new(),
            predicted_value: 0.5,
            visited: false,
        };

        assert!(!state.attach_links("https://x.test/", vec![link("https://x.test/a")]));

        state.record_page(PageContent {
            url: "https://x.test/".into(),
            title: "Home".into(),
            content: "hello".into(),
            content_type: "page".into(),
            extraction_time: None,
            metrics: None,
            links: None,
            entities: None,
        });
        assert!(state.attach_links("https://x.test/", vec![link("https://x.test/a")]));
        assert!(!state.attach_links("https://x.test/", vec![link("https://x.test/b")]));

        let links = state
            .extracted_page("https://x.test/")
            .and_then(|page| page.links.clone())
            .unwrap_or_default();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://x.test/a");
    }
}

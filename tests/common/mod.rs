//! Deterministic fake collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kodegen_tools_goalcrawl::crawl_engine::{
    AuthDetection, AuthHandler, AuthRequest, CrawlIntelligence, CrawlState, DiscoveredLink,
    ExtractedContent, FetchOptions, FetchResponse, NavigationDecision, PageCallback, PageFetcher,
    PageMetrics, UrlAnalysis, ValueMetrics,
};
use kodegen_tools_goalcrawl::{PageContent, ScrapeConfig, ScrapeEvent, ScrapeEventBus};
use regex::Regex;
use tokio::sync::broadcast;

static HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]+)""#).expect("regex"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<h1>(.*?)</h1>").expect("regex"));

/// Test page with a heading, a paragraph and the given links
pub fn page_html(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
        .collect();
    format!("<html><body><h1>{title}</h1><p>{body}</p>{anchors}</body></html>")
}

/// Login page the fake intelligence treats as requiring authentication
pub fn login_html() -> String {
    r#"<html><body><h1>Sign in</h1><p>Members only</p><form><input type="password" name="pw"></form></body></html>"#
        .to_string()
}

/// Minimal valid configuration for a seed URL
pub fn config(seed: &str) -> kodegen_tools_goalcrawl::config::ScrapeConfigBuilder<
    kodegen_tools_goalcrawl::config::WithBaseUrl,
> {
    ScrapeConfig::builder()
        .base_url(seed)
        .scraping_goal("collect docs")
        .deadlock_detection_ms(0)
}

// ============================================================================
// Fetchers
// ============================================================================

/// In-memory website. Unknown URLs answer with a 404.
#[derive(Default)]
pub struct FakeWeb {
    pages: Mutex<HashMap<String, String>>,
    locked: Mutex<HashMap<String, String>>,
    fetches: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn page(self, url: &str, html: impl Into<String>) -> Self {
        self.pages
            .lock()
            .expect("pages lock")
            .insert(url.to_string(), html.into());
        self
    }

    /// Serve a login page at `url` until [`FakeWeb::unlock`] is called
    pub fn locked_page(self, url: &str, html: impl Into<String>) -> Self {
        self.locked
            .lock()
            .expect("locked lock")
            .insert(url.to_string(), html.into());
        self
    }

    pub fn unlock(&self, url: &str) {
        if let Some(html) = self.locked.lock().expect("locked lock").remove(url) {
            self.pages
                .lock()
                .expect("pages lock")
                .insert(url.to_string(), html);
        }
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches
            .lock()
            .expect("fetches lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeWeb {
    async fn fetch(&self, url: &str, _options: FetchOptions) -> anyhow::Result<FetchResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        *self
            .fetches
            .lock()
            .expect("fetches lock")
            .entry(url.to_string())
            .or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        if self.locked.lock().expect("locked lock").contains_key(url) {
            return Ok(FetchResponse {
                html: login_html(),
                status: 200,
                final_url: url.to_string(),
                ..FetchResponse::default()
            });
        }
        match self.pages.lock().expect("pages lock").get(url) {
            Some(html) => Ok(FetchResponse {
                html: html.clone(),
                status: 200,
                final_url: url.to_string(),
                ..FetchResponse::default()
            }),
            None => Ok(FetchResponse {
                status: 404,
                ..FetchResponse::failed(url, "HTTP 404 Not Found")
            }),
        }
    }
}

/// Generates an endless chain of distinct pages, each linking to the next
#[derive(Default)]
pub struct EndlessWeb {
    pub delay: Duration,
}

#[async_trait]
impl PageFetcher for EndlessWeb {
    async fn fetch(&self, url: &str, _options: FetchOptions) -> anyhow::Result<FetchResponse> {
        tokio::time::sleep(self.delay).await;
        let n: u64 = url
            .rsplit('/')
            .next()
            .and_then(|last| last.parse().ok())
            .unwrap_or(0);
        let next = format!("https://endless.test/page/{}", n + 1);
        Ok(FetchResponse {
            html: page_html(&format!("Page {n}"), &format!("Body of page {n}"), &[&next]),
            status: 200,
            final_url: url.to_string(),
            ..FetchResponse::default()
        })
    }
}

/// Never completes a fetch
pub struct HangingFetcher;

#[async_trait]
impl PageFetcher for HangingFetcher {
    async fn fetch(&self, _url: &str, _options: FetchOptions) -> anyhow::Result<FetchResponse> {
        std::future::pending().await
    }
}

// ============================================================================
// Intelligence
// ============================================================================

/// Scripted intelligence reading structure straight from the fake pages.
///
/// Links are the page's `href`s, titles its `<h1>`, and pages with a password
/// field require authentication. Completeness is extracted / `target_pages`.
pub struct ScriptedIntelligence {
    pub target_pages: usize,
    pub failing_extractions: HashSet<String>,
    pub fail_everything: bool,
    pub complete_at: Option<f64>,
    pub link_values: HashMap<String, f64>,
}

impl Default for ScriptedIntelligence {
    fn default() -> Self {
        Self {
            target_pages: 1_000,
            failing_extractions: HashSet::new(),
            fail_everything: false,
            complete_at: None,
            link_values: HashMap::new(),
        }
    }
}

impl ScriptedIntelligence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_extraction(mut self, url: &str) -> Self {
        self.failing_extractions.insert(url.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_everything: true,
            ..Self::default()
        }
    }

    /// Navigator answers `complete` once completeness reaches `threshold`
    pub fn complete_at(mut self, target_pages: usize, threshold: f64) -> Self {
        self.target_pages = target_pages;
        self.complete_at = Some(threshold);
        self
    }

    pub fn link_value(mut self, href: &str, value: f64) -> Self {
        self.link_values.insert(href.to_string(), value);
        self
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail_everything {
            anyhow::bail!("intelligence offline");
        }
        Ok(())
    }
}

#[async_trait]
impl CrawlIntelligence for ScriptedIntelligence {
    async fn analyze_url(
        &self,
        url: &str,
        _goal: &str,
        _state: &CrawlState,
    ) -> anyhow::Result<UrlAnalysis> {
        self.check()?;
        Ok(UrlAnalysis {
            relevance_score: 0.9,
            expected_value: 0.9,
            is_allowed_by_robots: !url.contains("/private"),
            domain_authority: 0.5,
            was_visited_before: false,
        })
    }

    async fn detect_authentication(
        &self,
        html: &str,
        url: &str,
        _status: u16,
    ) -> anyhow::Result<AuthDetection> {
        self.check()?;
        let requires = html.contains(r#"type="password""#);
        Ok(AuthDetection {
            requires_authentication: requires,
            auth_request: requires.then(|| AuthRequest {
                auth_type: "form".to_string(),
                ..AuthRequest::for_url(url)
            }),
        })
    }

    async fn extract_content(
        &self,
        html: &str,
        url: &str,
        _state: &CrawlState,
    ) -> anyhow::Result<ExtractedContent> {
        self.check()?;
        if self.failing_extractions.contains(url) {
            anyhow::bail!("extractor rejected {url}");
        }
        let title = HEADING
            .captures(html)
            .and_then(|c| c.get(1))
            .map_or_else(|| url.to_string(), |m| m.as_str().to_string());
        Ok(ExtractedContent {
            title,
            content: html.to_string(),
            content_type: "page".to_string(),
            metrics: PageMetrics {
                information_density: 0.7,
                relevance: 0.8,
                uniqueness: 0.9,
                content_quality_analysis: None,
            },
            entities: Vec::new(),
        })
    }

    async fn discover_links(
        &self,
        html: &str,
        _url: &str,
        _state: &CrawlState,
    ) -> anyhow::Result<Vec<DiscoveredLink>> {
        self.check()?;
        Ok(HREF
            .captures_iter(html)
            .filter_map(|c| c.get(1))
            .map(|m| {
                let href = m.as_str().to_string();
                let predicted_value = self.link_values.get(&href).copied().unwrap_or(0.5);
                DiscoveredLink {
                    url: href,
                    context: String::new(),
                    predicted_value,
                }
            })
            .collect())
    }

    async fn evaluate_progress(&self, state: &CrawlState) -> anyhow::Result<ValueMetrics> {
        self.check()?;
        Ok(ValueMetrics {
            information_density: 0.7,
            relevance: 0.8,
            uniqueness: 0.9,
            completeness: state.extracted_count() as f64 / self.target_pages as f64,
        })
    }

    async fn decide_next_action(
        &self,
        _state: &CrawlState,
        metrics: &ValueMetrics,
    ) -> anyhow::Result<NavigationDecision> {
        self.check()?;
        Ok(match self.complete_at {
            Some(threshold) if metrics.completeness >= threshold => {
                NavigationDecision::complete("enough collected")
            }
            _ => NavigationDecision::proceed("keep going"),
        })
    }
}

// ============================================================================
// Hooks
// ============================================================================

/// Auth handler that unlocks the fake page and reports `succeed`
pub struct FakeAuth {
    pub web: Arc<FakeWeb>,
    pub succeed: bool,
    pub unlocks: bool,
    pub calls: AtomicUsize,
}

impl FakeAuth {
    pub fn new(web: Arc<FakeWeb>, succeed: bool) -> Self {
        Self {
            web,
            succeed,
            unlocks: succeed,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reports success but leaves the login page in place
    pub fn accepting_without_unlock(web: Arc<FakeWeb>) -> Self {
        Self {
            unlocks: false,
            ..Self::new(web, true)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthHandler for FakeAuth {
    async fn on_auth_required(&self, request: &AuthRequest) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unlocks {
            self.web.unlock(&request.url);
        }
        self.succeed
    }
}

/// Auth handler that never answers
#[derive(Default)]
pub struct HangingAuth {
    calls: AtomicUsize,
}

impl HangingAuth {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthHandler for HangingAuth {
    async fn on_auth_required(&self, _request: &AuthRequest) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Records every processed page URL; optionally fails each call
#[derive(Default)]
pub struct RecordingCallback {
    pub seen: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingCallback {
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl PageCallback for RecordingCallback {
    async fn on_page_processed(&self, page: &PageContent) -> anyhow::Result<()> {
        self.seen.lock().expect("seen lock").push(page.url.clone());
        if self.fail {
            anyhow::bail!("callback failed for {}", page.url);
        }
        Ok(())
    }
}

/// Subscribe before the run and collect every event once it ends
pub fn collect_events(bus: &ScrapeEventBus) -> tokio::task::JoinHandle<Vec<ScrapeEvent>> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        let mut events = Vec::new();
        loop {
            match receiver.recv().await {
                Ok(ScrapeEvent::Shutdown { .. }) | Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
                Ok(event) => events.push(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
            }
        }
        events
    })
}

//! Contracts for the services the orchestrator calls out to
//!
//! The engine never fetches or scores anything itself. A page fetcher, an
//! intelligence provider (LLM, heuristic or rule engine) and the optional
//! caller hooks are plugged in through these traits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::crawl_state::CrawlState;
use super::crawl_types::{EntityRef, PageContent, PageMetrics, ValueMetrics, clamp_unit};
use crate::utils::FALLBACK_URL_SCORE;

// ============================================================================
// FETCH
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    pub execute_javascript: bool,
}

/// Raw fetch result. Network failures are reported through `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub html: String,
    pub status: u16,
    pub final_url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchResponse {
    /// In-band failure with no body
    #[must_use]
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            html: String::new(),
            status: 0,
            final_url: url.to_string(),
            headers: HashMap::new(),
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`. Implementations should report network failures in-band;
    /// an `Err` is treated the same way by the orchestrator.
    async fn fetch(&self, url: &str, options: FetchOptions) -> anyhow::Result<FetchResponse>;
}

// ============================================================================
// INTELLIGENCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAnalysis {
    pub relevance_score: f64,
    pub expected_value: f64,
    pub is_allowed_by_robots: bool,
    pub domain_authority: f64,
    pub was_visited_before: bool,
}

impl UrlAnalysis {
    /// Low fixed score used when analysis fails
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            relevance_score: FALLBACK_URL_SCORE,
            expected_value: FALLBACK_URL_SCORE,
            is_allowed_by_robots: true,
            domain_authority: 0.0,
            was_visited_before: false,
        }
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            relevance_score: clamp_unit(self.relevance_score),
            expected_value: clamp_unit(self.expected_value),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub url: String,
    pub auth_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub callback_url: String,
    pub session_token: String,
    pub auth_portal_url: String,
}

impl AuthRequest {
    /// Minimal request for a page that needs credentials of unknown kind
    #[must_use]
    pub fn for_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
            auth_type: "unknown".to_string(),
            callback_url: url.to_string(),
            auth_portal_url: url.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDetection {
    pub requires_authentication: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_request: Option<AuthRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub metrics: PageMetrics,
    #[serde(default)]
    pub entities: Vec<EntityRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredLink {
    /// Absolute, or relative to the page it was found on
    pub url: String,
    pub context: String,
    pub predicted_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationAction {
    Continue,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationDecision {
    pub action: NavigationAction,
    pub reason: String,
}

impl NavigationDecision {
    #[must_use]
    pub fn proceed(reason: impl Into<String>) -> Self {
        Self {
            action: NavigationAction::Continue,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn complete(reason: impl Into<String>) -> Self {
        Self {
            action: NavigationAction::Complete,
            reason: reason.into(),
        }
    }
}

/// Scoring, extraction and navigation decisions
///
/// Every method is a request/response call. Failures never abort a crawl;
/// the orchestrator substitutes a conservative fallback instead.
#[async_trait]
pub trait CrawlIntelligence: Send + Sync {
    async fn analyze_url(
        &self,
        url: &str,
        goal: &str,
        state: &CrawlState,
    ) -> anyhow::Result<UrlAnalysis>;

    async fn detect_authentication(
        &self,
        html: &str,
        url: &str,
        status: u16,
    ) -> anyhow::Result<AuthDetection>;

    async fn extract_content(
        &self,
        html: &str,
        url: &str,
        state: &CrawlState,
    ) -> anyhow::Result<ExtractedContent>;

    async fn discover_links(
        &self,
        html: &str,
        url: &str,
        state: &CrawlState,
    ) -> anyhow::Result<Vec<DiscoveredLink>>;

    async fn evaluate_progress(&self, state: &CrawlState) -> anyhow::Result<ValueMetrics>;

    async fn decide_next_action(
        &self,
        state: &CrawlState,
        metrics: &ValueMetrics,
    ) -> anyhow::Result<NavigationDecision>;
}

// ============================================================================
// CALLER HOOKS
// ============================================================================

#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Resolve the authentication request, returning whether it succeeded
    async fn on_auth_required(&self, request: &AuthRequest) -> bool;
}

#[async_trait]
pub trait PageCallback: Send + Sync {
    /// Called once per newly extracted page. Errors are logged and ignored.
    async fn on_page_processed(&self, page: &PageContent) -> anyhow::Result<()>;
}

/// Optional caller-supplied callbacks
#[derive(Clone, Default)]
pub struct CrawlHooks {
    pub auth_handler: Option<Arc<dyn AuthHandler>>,
    pub page_callback: Option<Arc<dyn PageCallback>>,
}

impl CrawlHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_auth_handler(mut self, handler: Arc<dyn AuthHandler>) -> Self {
        self.auth_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_page_callback(mut self, callback: Arc<dyn PageCallback>) -> Self {
        self.page_callback = Some(callback);
        self
    }
}

impl fmt::Debug for CrawlHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlHooks")
            .field("auth_handler", &self.auth_handler.is_some())
            .field("page_callback", &self.page_callback.is_some())
            .finish()
    }
}

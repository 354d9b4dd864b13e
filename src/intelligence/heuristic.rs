//! Rule-based crawl intelligence
//!
//! Scores and extracts pages from keyword overlap with the goal and simple
//! document structure. Deterministic and offline, so it works without a
//! model and gives repeatable crawls.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector, node::Node};

use crate::config::ScrapeConfig;
use crate::crawl_engine::{
    AuthDetection, AuthRequest, CrawlIntelligence, CrawlState, DiscoveredLink, EntityRef,
    ExtractedContent, NavigationDecision, PageMetrics, UrlAnalysis, ValueMetrics,
};
use crate::utils::{DEFAULT_COMPLETENESS_THRESHOLD, DEFAULT_MAX_PAGES, NEUTRAL_METRIC, extract_host};

/// Words per page at which information density saturates
const DENSE_PAGE_WORDS: f64 = 600.0;
const MAX_LINKS_PER_PAGE: usize = 200;
const MAX_ENTITIES_PER_PAGE: usize = 10;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "all", "any", "about",
    "into", "find", "get", "list", "their", "them", "they", "what", "which", "who", "how", "page",
    "pages", "site", "website", "information", "details",
];

static ENTITY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)\b").ok());

static SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "iframe", "svg", "head", "nav", "footer", "template",
];

/// Deterministic, heuristic implementation of every intelligence call
#[derive(Debug, Clone)]
pub struct HeuristicIntelligence {
    completeness_threshold: f64,
    target_pages: usize,
    include_images: bool,
}

impl Default for HeuristicIntelligence {
    fn default() -> Self {
        Self {
            completeness_threshold: DEFAULT_COMPLETENESS_THRESHOLD,
            target_pages: DEFAULT_MAX_PAGES,
            include_images: false,
        }
    }
}

impl HeuristicIntelligence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Match thresholds and page targets to a run configuration
    #[must_use]
    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self {
            completeness_threshold: config.completeness_threshold(),
            target_pages: config.max_pages().max(1),
            include_images: config.include_images(),
        }
    }
}

/// Lowercased goal keywords, stopwords removed
#[must_use]
pub fn goal_terms(goal: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    goal.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.len() >= 3 && !STOPWORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// Fraction of `terms` found in `text` (case-insensitive), neutral when there are no terms
#[must_use]
pub fn term_coverage(terms: &[String], text: &str) -> f64 {
    if terms.is_empty() {
        return NEUTRAL_METRIC;
    }
    let haystack = text.to_lowercase();
    let hits = terms.iter().filter(|term| haystack.contains(term.as_str())).count();
    hits as f64 / terms.len() as f64
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn visible_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    visible_text(child, out);
                }
            }
            _ => {}
        }
    }
}

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

struct ParsedPage {
    title: Option<String>,
    text: String,
    content_type: &'static str,
    images: Vec<(String, String)>,
}

fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let first_text = |css: &str| {
        selector(css)
            .and_then(|sel| document.select(&sel).next())
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
    };

    let title = first_text("title").or_else(|| first_text("h1"));

    let root = ["main", "article", "body", "html"]
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| document.select(&sel).next());
    let mut parts = Vec::new();
    if let Some(root) = root {
        visible_text(root, &mut parts);
    }
    let text = collapse_whitespace(&parts.join(" "));

    let count = |css: &str| selector(css).map_or(0, |sel| document.select(&sel).count());
    let content_type = if count("form input[type=password]") > 0 {
        "login"
    } else if count("article") > 0 {
        "article"
    } else if count("pre code") > 0 {
        "documentation"
    } else if count("li a") >= 20 {
        "listing"
    } else {
        "page"
    };

    let images = selector("img[src]")
        .map(|sel| {
            document
                .select(&sel)
                .filter_map(|img| {
                    let src = img.value().attr("src")?.to_string();
                    let alt = img.value().attr("alt").unwrap_or_default().to_string();
                    Some((alt, src))
                })
                .collect()
        })
        .unwrap_or_default();

    ParsedPage {
        title,
        text,
        content_type,
        images,
    }
}

fn extract_entities(text: &str, terms: &[String]) -> Vec<EntityRef> {
    let Some(pattern) = ENTITY_PATTERN.as_ref() else {
        return Vec::new();
    };
    let mut mentions: HashMap<&str, u32> = HashMap::new();
    for capture in pattern.captures_iter(text) {
        if let Some(phrase) = capture.get(1) {
            *mentions.entry(phrase.as_str()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&str, u32)> = mentions.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_ENTITIES_PER_PAGE)
        .map(|(name, count)| EntityRef {
            name: name.to_string(),
            entity_type: "phrase".to_string(),
            relevance: Some(term_coverage(terms, name)),
            mentions: Some(count),
        })
        .collect()
}

fn find_links(html: &str, terms: &[String]) -> Vec<DiscoveredLink> {
    let document = Html::parse_document(html);
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    document
        .select(&anchors)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim().to_string();
            if href.is_empty() || href.starts_with('#') || !seen.insert(href.clone()) {
                return None;
            }
            let text = collapse_whitespace(&anchor.text().collect::<String>());
            let context = if text.is_empty() {
                anchor.value().attr("title").unwrap_or_default().to_string()
            } else {
                text
            };
            let predicted_value = if terms.is_empty() {
                NEUTRAL_METRIC
            } else {
                0.2 + 0.8 * term_coverage(terms, &format!("{context} {href}"))
            };
            Some(DiscoveredLink {
                url: href,
                context,
                predicted_value,
            })
        })
        .take(MAX_LINKS_PER_PAGE)
        .collect()
}

fn detect_login_form(html: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let password = selector("input[type=password]")?;
    document.select(&password).next()?;

    let fields = selector("form input[name]")
        .map(|sel| {
            document
                .select(&sel)
                .filter(|input| input.value().attr("type") != Some("hidden"))
                .filter_map(|input| input.value().attr("name").map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Some(fields)
}

#[async_trait]
impl CrawlIntelligence for HeuristicIntelligence {
    async fn analyze_url(
        &self,
        url: &str,
        goal: &str,
        state: &CrawlState,
    ) -> anyhow::Result<UrlAnalysis> {
        let terms = goal_terms(goal);
        let relevance = if terms.is_empty() {
            NEUTRAL_METRIC
        } else {
            0.3 + 0.7 * term_coverage(&terms, url)
        };
        let domain_authority = if url.starts_with("https://") { 0.6 } else { 0.4 };

        Ok(UrlAnalysis {
            relevance_score: relevance,
            expected_value: relevance * (1.0 / (1.0 + f64::from(state.current_depth()) * 0.25)),
            is_allowed_by_robots: true,
            domain_authority,
            was_visited_before: state.is_visited(url),
        })
    }

    async fn detect_authentication(
        &self,
        html: &str,
        url: &str,
        status: u16,
    ) -> anyhow::Result<AuthDetection> {
        if status == 401 || status == 407 {
            return Ok(AuthDetection {
                requires_authentication: true,
                auth_request: Some(AuthRequest {
                    auth_type: "http".to_string(),
                    ..AuthRequest::for_url(url)
                }),
            });
        }

        Ok(match detect_login_form(html) {
            Some(fields) => AuthDetection {
                requires_authentication: true,
                auth_request: Some(AuthRequest {
                    auth_type: "form".to_string(),
                    form_fields: Some(fields),
                    instructions: Some(format!("Sign in at {url} to continue crawling")),
                    ..AuthRequest::for_url(url)
                }),
            },
            None => AuthDetection::default(),
        })
    }

    async fn extract_content(
        &self,
        html: &str,
        url: &str,
        state: &CrawlState,
    ) -> anyhow::Result<ExtractedContent> {
        let terms = goal_terms(state.goal());
        let parsed = parse_page(html);
        if parsed.text.is_empty() {
            anyhow::bail!("no visible text on {url}");
        }

        let words = parsed.text.split_whitespace().count();
        let own_words = word_set(&parsed.text);
        let overlap = state
            .extracted_pages()
            .iter()
            .map(|page| jaccard(&own_words, &word_set(&page.content)))
            .fold(0.0, f64::max);

        let title = parsed
            .title
            .clone()
            .or_else(|| extract_host(url))
            .unwrap_or_else(|| url.to_string());

        let mut content = parsed.text;
        if self.include_images && !parsed.images.is_empty() {
            content.push_str("\n\nImages:");
            for (alt, src) in &parsed.images {
                content.push_str(&format!("\n- {alt} ({src})"));
            }
        }

        let entities = extract_entities(&content, &terms);
        let metrics = PageMetrics {
            information_density: (words as f64 / DENSE_PAGE_WORDS).min(1.0),
            relevance: term_coverage(&terms, &format!("{title} {content}")),
            uniqueness: 1.0 - overlap,
            content_quality_analysis: Some(format!(
                "{words} words, {} entities, {} content",
                entities.len(),
                parsed.content_type
            )),
        };

        Ok(ExtractedContent {
            title,
            content,
            content_type: parsed.content_type.to_string(),
            metrics,
            entities,
        })
    }

    async fn discover_links(
        &self,
        html: &str,
        _url: &str,
        state: &CrawlState,
    ) -> anyhow::Result<Vec<DiscoveredLink>> {
        Ok(find_links(html, &goal_terms(state.goal())))
    }

    async fn evaluate_progress(&self, state: &CrawlState) -> anyhow::Result<ValueMetrics> {
        let pages = state.extracted_pages();
        if pages.is_empty() {
            return Ok(ValueMetrics::default());
        }

        let count = pages.len() as f64;
        let average = |pick: fn(&PageMetrics) -> f64| {
            pages
                .iter()
                .map(|page| page.metrics.as_ref().map_or(NEUTRAL_METRIC, pick))
                .sum::<f64>()
                / count
        };
        let relevance = average(|m| m.relevance);
        let coverage = (count / self.target_pages as f64).min(1.0);

        Ok(ValueMetrics {
            information_density: average(|m| m.information_density),
            relevance,
            uniqueness: average(|m| m.uniqueness),
            completeness: coverage * (0.5 + 0.5 * relevance),
        })
    }

    async fn decide_next_action(
        &self,
        state: &CrawlState,
        metrics: &ValueMetrics,
    ) -> anyhow::Result<NavigationDecision> {
        if metrics.completeness >= self.completeness_threshold {
            return Ok(NavigationDecision::complete(format!(
                "goal completion {:.2} reached the {:.2} threshold",
                metrics.completeness, self.completeness_threshold
            )));
        }
        Ok(NavigationDecision::proceed(format!(
            "completion {:.2}, {} links queued",
            metrics.completeness,
            state.queue_size()
        )))
    }
}

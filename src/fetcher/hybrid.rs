//! Fetcher that picks HTTP or Chromium per request

use async_trait::async_trait;
use log::{debug, warn};

use super::browser::ChromiumFetcher;
use super::http::HttpFetcher;
use crate::crawl_engine::{CrawlError, FetchOptions, FetchResponse, PageFetcher};

/// Routes `execute_javascript` fetches to Chromium and the rest to plain HTTP
///
/// If the browser cannot be launched the request falls back to HTTP, so a
/// machine without Chrome still crawls static pages.
#[derive(Debug)]
pub struct HybridFetcher {
    http: HttpFetcher,
    browser: ChromiumFetcher,
}

impl HybridFetcher {
    #[must_use]
    pub fn new(http: HttpFetcher, browser: ChromiumFetcher) -> Self {
        Self { http, browser }
    }

    /// HTTP client with defaults plus a headless browser
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::Network` if the HTTP client cannot be built.
    pub fn with_defaults() -> Result<Self, CrawlError> {
        Ok(Self::new(HttpFetcher::new()?, ChromiumFetcher::new(true)))
    }

    /// Close the browser if one was launched
    pub async fn shutdown(&self) {
        self.browser.shutdown().await;
    }
}

#[async_trait]
impl PageFetcher for HybridFetcher {
    async fn fetch(&self, url: &str, options: FetchOptions) -> anyhow::Result<FetchResponse> {
        if !options.execute_javascript {
            return self.http.fetch(url, options).await;
        }

        match self.browser.render(url).await {
            Ok(response) => {
                debug!("Rendered {url} in Chromium ({} bytes)", response.html.len());
                Ok(response)
            }
            Err(CrawlError::Browser(reason)) => {
                warn!("Browser unavailable ({reason}), fetching {url} over HTTP");
                self.http.fetch(url, options).await
            }
            Err(e) => Ok(FetchResponse::failed(url, e.to_string())),
        }
    }
}

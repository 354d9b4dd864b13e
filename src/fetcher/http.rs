//! Plain HTTP page fetcher

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::crawl_engine::{CrawlError, FetchOptions, FetchResponse, PageFetcher};
use crate::utils::constants::CHROME_USER_AGENT;

/// Default per-request timeout for the HTTP client
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Statuses whose body is kept so authentication detection can inspect it
const AUTH_STATUSES: [StatusCode; 3] = [
    StatusCode::UNAUTHORIZED,
    StatusCode::FORBIDDEN,
    StatusCode::PROXY_AUTHENTICATION_REQUIRED,
];

/// Fetches raw HTML over HTTP without executing JavaScript
///
/// Never returns `Err`: transport failures and error statuses are reported
/// through `FetchResponse::error`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the default timeout and user agent
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::Network` if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, CrawlError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// # Errors
    ///
    /// Returns `CrawlError::Network` if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(CHROME_USER_AGENT)
            .build()
            .map_err(|e| CrawlError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an existing client, e.g. one with a proxy configured
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<FetchResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        let (html, error) = if status.is_success() || AUTH_STATUSES.contains(&status) {
            (body, None)
        } else {
            (String::new(), Some(format!("HTTP {status}")))
        };

        Ok(FetchResponse {
            html,
            status: status.as_u16(),
            final_url,
            headers,
            error,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, _options: FetchOptions) -> anyhow::Result<FetchResponse> {
        match self.get(url).await {
            Ok(response) => {
                log::debug!("Fetched {url} over HTTP: {} ({} bytes)", response.status, response.html.len());
                Ok(response)
            }
            Err(e) => {
                log::warn!("HTTP fetch failed for {url}: {e}");
                Ok(FetchResponse::failed(url, e.to_string()))
            }
        }
    }
}

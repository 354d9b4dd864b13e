//! Headless Chromium fetcher for pages that need JavaScript
//!
//! The browser is launched lazily on the first fetch and reused for the rest
//! of the run. A system Chrome/Chromium is preferred; otherwise a managed
//! Chromium is downloaded into the user cache directory.

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::crawl_engine::{CrawlError, FetchOptions, FetchResponse, PageFetcher};
use crate::utils::constants::CHROME_USER_AGENT;

/// Seconds the browser waits on a single CDP request
const CDP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Locate a Chrome/Chromium executable.
///
/// `CHROMIUM_PATH` wins when it points at an existing file; then the usual
/// install locations for the platform are tried, then `which` on Unix.
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Some(path);
        }
        warn!("CHROMIUM_PATH points to a missing file: {}", path.display());
    }

    let candidates: &[&str] = if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
        ]
    };

    if let Some(found) = candidates.iter().map(PathBuf::from).find(|p| p.exists()) {
        info!("Found browser at {}", found.display());
        return Some(found);
    }

    if cfg!(target_os = "windows") {
        return None;
    }
    ["chromium", "chromium-browser", "google-chrome", "chrome"]
        .iter()
        .find_map(|cmd| {
            let output = Command::new("which").arg(cmd).output().ok()?;
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (output.status.success() && !path.is_empty()).then(|| PathBuf::from(path))
        })
}

/// Download a managed Chromium into `<cache>/goalcrawl/chromium`
///
/// # Errors
///
/// Fails if the cache directory cannot be created or the download fails.
pub async fn download_managed_browser() -> anyhow::Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("goalcrawl")
        .join("chromium");
    tokio::fs::create_dir_all(&cache_dir)
        .await
        .context("Failed to create browser cache directory")?;

    info!("Downloading managed Chromium into {}", cache_dir.display());
    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build browser fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("Failed to download Chromium")?;
    Ok(revision.executable_path)
}

/// A browser tab that can be closed without awaiting the caller
trait CloseInBackground: Clone + Send + 'static {
    fn close_in_background(self, label: String);
}

impl CloseInBackground for Page {
    fn close_in_background(self, label: String) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime to close page for {label}");
            return;
        };
        runtime.spawn(async move {
            if let Err(e) = self.close().await {
                debug!("Failed to close page for {label}: {e}");
            }
        });
    }
}

/// Closes the wrapped tab on every exit path, including a dropped future
struct PageGuard<P: CloseInBackground> {
    page: P,
    label: String,
}

impl<P: CloseInBackground> PageGuard<P> {
    fn new(page: P, label: impl Into<String>) -> Self {
        Self {
            page,
            label: label.into(),
        }
    }
}

impl<P: CloseInBackground> std::ops::Deref for PageGuard<P> {
    type Target = P;

    fn deref(&self) -> &P {
        &self.page
    }
}

impl<P: CloseInBackground> Drop for PageGuard<P> {
    fn drop(&mut self) {
        self.page
            .clone()
            .close_in_background(std::mem::take(&mut self.label));
    }
}

/// A running browser and the task driving its CDP connection
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(headless: bool) -> anyhow::Result<Self> {
        let executable = match find_browser_executable() {
            Some(path) => path,
            None => download_managed_browser().await?,
        };
        let user_data_dir =
            std::env::temp_dir().join(format!("goalcrawl_chrome_{}", std::process::id()));

        let mut builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(CDP_REQUEST_TIMEOUT_SECS))
            .window_size(1920, 1080)
            .user_data_dir(user_data_dir)
            .chrome_executable(executable)
            .arg(format!("--user-agent={CHROME_USER_AGENT}"))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-notifications")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--mute-audio");
        builder = if headless {
            builder.headless_mode(HeadlessMode::default())
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    let message = e.to_string();
                    // chromiumoxide does not know every CDP message Chrome sends
                    if message.contains("data did not match any variant of untagged enum Message")
                        || message.contains("Failed to deserialize WS response")
                    {
                        trace!("Ignoring unknown CDP message: {message}");
                    } else {
                        error!("Browser handler error: {e:?}");
                    }
                }
            }
            debug!("Browser handler task completed");
        });

        Ok(Self { browser, handler })
    }

    async fn render(&self, url: &str) -> anyhow::Result<FetchResponse> {
        let page = PageGuard::new(
            self.browser
                .new_page(url)
                .await
                .with_context(|| format!("Failed to open {url}"))?,
            url,
        );
        page.wait_for_navigation()
            .await
            .with_context(|| format!("Navigation to {url} did not finish"))?;

        let html = page.content().await.context("Failed to read page content")?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(FetchResponse {
            html,
            // CDP does not report the document status without network interception
            status: 200,
            final_url,
            headers: Default::default(),
            error: None,
        })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {e}");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

/// Renders pages in a lazily launched headless Chromium
pub struct ChromiumFetcher {
    headless: bool,
    session: Mutex<Option<BrowserSession>>,
    launch_failed: AtomicBool,
}

impl Default for ChromiumFetcher {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for ChromiumFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumFetcher")
            .field("headless", &self.headless)
            .field("launch_failed", &self.launch_failed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ChromiumFetcher {
    #[must_use]
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            session: Mutex::new(None),
            launch_failed: AtomicBool::new(false),
        }
    }

    /// Render `url`, distinguishing browser launch failures from page failures
    ///
    /// # Errors
    ///
    /// `CrawlError::Browser` when no browser could be launched,
    /// `CrawlError::Network` when the page itself failed to load.
    pub async fn render(&self, url: &str) -> Result<FetchResponse, CrawlError> {
        if self.launch_failed.load(Ordering::Acquire) {
            return Err(CrawlError::Browser("browser unavailable".into()));
        }

        let mut session = self.session.lock().await;
        if session.is_none() {
            match BrowserSession::launch(self.headless).await {
                Ok(launched) => *session = Some(launched),
                Err(e) => {
                    self.launch_failed.store(true, Ordering::Release);
                    return Err(CrawlError::Browser(format!("{e:#}")));
                }
            }
        }
        let Some(active) = session.as_ref() else {
            return Err(CrawlError::Browser("browser session missing".into()));
        };

        active
            .render(url)
            .await
            .map_err(|e| CrawlError::Network(format!("{e:#}")))
    }

    /// Close the browser if it was launched
    pub async fn shutdown(&self) {
        if let Some(session) = self.session.lock().await.take() {
            info!("Closing browser");
            session.close().await;
        }
    }
}

#[async_trait]
impl PageFetcher for ChromiumFetcher {
    async fn fetch(&self, url: &str, _options: FetchOptions) -> anyhow::Result<FetchResponse> {
        match self.render(url).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!("Browser fetch failed for {url}: {e}");
                Ok(FetchResponse::failed(url, e.to_string()))
            }
        }
    }
}

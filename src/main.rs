//! Goal-directed crawler CLI
//!
//! ```bash
//! kodegen-goalcrawl https://docs.rs --goal "async runtime comparison" --max-pages 20
//! kodegen-goalcrawl https://example.com --javascript --events --output report.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kodegen_tools_goalcrawl::crawl_events::ScrapeEvent;
use kodegen_tools_goalcrawl::utils::{
    DEFAULT_DEADLOCK_DETECTION_MS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_EXECUTION_TIME_MS,
    DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PAGES,
};
use kodegen_tools_goalcrawl::{
    GoalCrawler, HeuristicIntelligence, HybridFetcher, ScrapeConfig, ScrapeEventBus,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const EVENT_BUS_CAPACITY: usize = 1024;

/// Crawl a site toward a goal and print what was found as JSON.
#[derive(Parser, Debug)]
#[command(name = "kodegen-goalcrawl", version, about)]
struct Cli {
    /// Seed URL
    url: String,

    /// What the crawl should find
    #[arg(short, long, default_value = "")]
    goal: String,

    #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Render pages in headless Chromium
    #[arg(long)]
    javascript: bool,

    /// Allow the same normalized URL or content to be extracted twice
    #[arg(long)]
    allow_duplicates: bool,

    /// Only follow links containing this substring (repeatable)
    #[arg(long = "include")]
    include: Vec<String>,

    /// Never follow links containing this substring (repeatable)
    #[arg(long = "exclude")]
    exclude: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: u32,

    /// Wall-clock limit for the whole run
    #[arg(long, default_value_t = DEFAULT_MAX_EXECUTION_TIME_MS)]
    timeout_ms: u64,

    /// Stop when nothing progresses for this long (0 disables)
    #[arg(long, default_value_t = DEFAULT_DEADLOCK_DETECTION_MS)]
    deadlock_ms: u64,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log every crawl event
    #[arg(long)]
    events: bool,
}

fn log_events(bus: &ScrapeEventBus) -> tokio::task::JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(ScrapeEvent::Shutdown { .. }) | Err(RecvError::Closed) => break,
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "goalcrawl::events", "{json}"),
                    Err(e) => warn!("Failed to serialize {} event: {e}", event.kind()),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event log skipped {skipped} events"),
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut builder = ScrapeConfig::builder()
        .base_url(&cli.url)
        .scraping_goal(&cli.goal)
        .max_pages(cli.max_pages)
        .max_depth(cli.max_depth)
        .execute_javascript(cli.javascript)
        .prevent_duplicate_urls(!cli.allow_duplicates)
        .max_iterations(cli.max_iterations)
        .max_execution_time_ms(cli.timeout_ms)
        .deadlock_detection_ms(cli.deadlock_ms);
    for pattern in cli.include {
        builder = builder.must_include_pattern(pattern);
    }
    for pattern in cli.exclude {
        builder = builder.exclude_pattern(pattern);
    }

    let event_logger = if cli.events {
        let bus = Arc::new(ScrapeEventBus::new(EVENT_BUS_CAPACITY));
        let handle = log_events(&bus);
        builder = builder.event_bus(bus);
        Some(handle)
    } else {
        None
    };

    let config = builder.build()?;
    let fetcher = Arc::new(HybridFetcher::with_defaults()?);
    let intelligence = Arc::new(HeuristicIntelligence::from_config(&config));
    let crawler = GoalCrawler::new(config, fetcher.clone(), intelligence);

    let cancel = crawler.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing with what has been extracted");
            cancel.cancel();
        }
    });

    let output = crawler.run().await;
    fetcher.shutdown().await;
    if let Some(handle) = event_logger {
        let _ = handle.await;
    }

    let json = serde_json::to_string_pretty(&output).context("Failed to serialize report")?;
    match cli.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

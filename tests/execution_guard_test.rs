//! Termination races: timeout, stagnation, cancellation and loop caps

use std::sync::Arc;
use std::time::Duration;

use kodegen_tools_goalcrawl::crawl_engine::CrawlHooks;
use kodegen_tools_goalcrawl::{GoalCrawler, ScrapeEvent, ScrapeEventBus, TerminationReason};

mod common;
use common::{EndlessWeb, FakeWeb, HangingAuth, HangingFetcher, ScriptedIntelligence, config, page_html};

const ENDLESS_SEED: &str = "https://endless.test/page/0";

#[tokio::test(start_paused = true)]
async fn endless_frontier_stops_at_the_timeout() {
    let config = config(ENDLESS_SEED)
        .max_pages(10_000)
        .max_depth(10_000)
        .max_iterations(10_000)
        .max_execution_time_ms(1_000)
        .build()
        .unwrap();
    let fetcher = Arc::new(EndlessWeb {
        delay: Duration::from_millis(50),
    });

    let started = tokio::time::Instant::now();
    let output = GoalCrawler::new(config, fetcher, Arc::new(ScriptedIntelligence::new()))
        .run()
        .await;

    assert_eq!(output.termination, TerminationReason::Timeout);
    assert!(!output.pages.is_empty());
    assert!(output.pages.len() <= 20, "{} pages", output.pages.len());
    assert!(started.elapsed() < Duration::from_millis(1_100));
    assert_eq!(output.summary.pages_scraped, output.pages.len());
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_is_reported_as_deadlock() {
    let config = config("https://hang.test/")
        .deadlock_detection_ms(1_000)
        .deadlock_check_interval_ms(100)
        .collaborator_timeout_secs(3_600)
        .build()
        .unwrap();

    let output = GoalCrawler::new(
        config,
        Arc::new(HangingFetcher),
        Arc::new(ScriptedIntelligence::new()),
    )
    .run()
    .await;

    assert_eq!(output.termination, TerminationReason::Deadlock);
    assert!(output.pages.is_empty());
    assert_eq!(output.summary.pages_scraped, 0);
}

#[tokio::test(start_paused = true)]
async fn reloaded_config_keeps_the_stagnation_detector_alive() {
    let built = config("https://hang.test/")
        .deadlock_detection_ms(1_000)
        .collaborator_timeout_secs(3_600)
        .build()
        .unwrap();
    let mut json = serde_json::to_value(&built).unwrap();
    json["deadlockCheckIntervalMs"] = serde_json::json!(0);
    let reloaded: kodegen_tools_goalcrawl::ScrapeConfig = serde_json::from_value(json).unwrap();

    let started = tokio::time::Instant::now();
    let output = GoalCrawler::new(
        reloaded,
        Arc::new(HangingFetcher),
        Arc::new(ScriptedIntelligence::new()),
    )
    .run()
    .await;

    assert_eq!(output.termination, TerminationReason::Deadlock);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_times_out_as_a_collaborator_failure() {
    let config = config("https://hang.test/")
        .collaborator_timeout_secs(2)
        .build()
        .unwrap();

    let output = GoalCrawler::new(
        config,
        Arc::new(HangingFetcher),
        Arc::new(ScriptedIntelligence::new()),
    )
    .run()
    .await;

    assert_eq!(output.termination, TerminationReason::FrontierExhausted);
    let last_error = output.last_error.unwrap_or_default();
    assert!(last_error.contains("timed out after 2 seconds"), "{last_error}");
}

#[tokio::test(start_paused = true)]
async fn hung_auth_handler_is_cut_off_by_the_timeout() {
    let seed = "https://login.test/";
    let web = Arc::new(FakeWeb::new().locked_page(seed, page_html("Members", "Secret", &[])));
    let auth = Arc::new(HangingAuth::default());
    let config = config(seed)
        .max_execution_time_ms(1_000)
        .collaborator_timeout_secs(3_600)
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let output = GoalCrawler::new(config, web, Arc::new(ScriptedIntelligence::new()))
        .with_hooks(CrawlHooks::new().with_auth_handler(auth.clone()))
        .run()
        .await;

    assert_eq!(auth.calls(), 1);
    assert_eq!(output.termination, TerminationReason::Timeout);
    assert!(output.pages.is_empty());
    assert!(started.elapsed() < Duration::from_millis(1_100));
}

#[tokio::test(start_paused = true)]
async fn cancel_keeps_partial_results() {
    let config = config(ENDLESS_SEED)
        .max_pages(10_000)
        .max_depth(10_000)
        .max_iterations(10_000)
        .build()
        .unwrap();
    let crawler = GoalCrawler::new(
        config,
        Arc::new(EndlessWeb {
            delay: Duration::from_millis(50),
        }),
        Arc::new(ScriptedIntelligence::new()),
    );
    let cancel = crawler.cancel_handle();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(275)).await;
        (cancel.cancel(), cancel.cancel())
    });

    let output = crawler.run().await;

    // Only the first trigger counts
    assert_eq!(canceller.await.unwrap(), (true, false));
    assert_eq!(output.termination, TerminationReason::Cancelled);
    assert!((4..=6).contains(&output.pages.len()), "{} pages", output.pages.len());
}

#[tokio::test]
async fn iteration_cap_bounds_the_loop() {
    let config = config(ENDLESS_SEED)
        .max_pages(10_000)
        .max_depth(10_000)
        .max_iterations(3)
        .build()
        .unwrap();

    let output = GoalCrawler::new(
        config,
        Arc::new(EndlessWeb::default()),
        Arc::new(ScriptedIntelligence::new()),
    )
    .run()
    .await;

    assert_eq!(output.termination, TerminationReason::IterationLimit);
    assert_eq!(output.pages.len(), 3);
}

#[tokio::test]
async fn forced_stop_is_announced_on_the_event_feed() {
    let bus = Arc::new(ScrapeEventBus::new(256));
    let collector = common::collect_events(&bus);
    let config = config(ENDLESS_SEED)
        .max_pages(10_000)
        .max_depth(10_000)
        .max_iterations(2)
        .event_bus(bus)
        .build()
        .unwrap();

    GoalCrawler::new(
        config,
        Arc::new(EndlessWeb::default()),
        Arc::new(ScriptedIntelligence::new()),
    )
    .run()
    .await;
    let events = collector.await.unwrap();

    assert!(events.iter().any(|e| matches!(
        e,
        ScrapeEvent::Error { error } if error.contains("iteration limit")
    )));
    assert!(matches!(events.last(), Some(ScrapeEvent::ScrapingComplete { .. })));
}

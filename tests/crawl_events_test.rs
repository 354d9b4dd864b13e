use kodegen_tools_goalcrawl::crawl_events::*;
use std::time::Duration;
use tokio::time::timeout;

fn progress(pages: usize) -> ScrapeEvent {
    ScrapeEvent::Progress {
        pages_scraped: pages,
        queue_size: 3,
        goal_completion: 0.25,
    }
}

#[tokio::test]
async fn test_event_bus_creation() {
    let bus = ScrapeEventBus::new(100);
    assert_eq!(bus.subscriber_count(), 0);
    assert!(!bus.has_subscribers());
}

#[tokio::test]
async fn test_publish_with_no_subscribers() {
    let bus = ScrapeEventBus::new(10);
    let result = bus
        .publish(ScrapeEvent::url_processing("https://example.com", 0))
        .await;

    match result {
        Err(EventBusError::NoSubscribers) => {}
        other => panic!("Expected EventBusError::NoSubscribers, got: {other:?}"),
    }
    assert_eq!(bus.metrics().snapshot().events_failed, 1);
}

#[tokio::test]
async fn test_subscribe_and_publish() {
    let bus = ScrapeEventBus::new(10);
    let mut receiver = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 1);

    let result = bus
        .publish(ScrapeEvent::fetch_started("https://example.com", true))
        .await;
    assert_eq!(result.ok(), Some(1));

    let received = match timeout(Duration::from_millis(100), receiver.recv()).await {
        Ok(Ok(event)) => event,
        Ok(Err(e)) => panic!("Failed to receive event: {e}"),
        Err(_) => panic!("Timeout waiting for event"),
    };
    match received {
        ScrapeEvent::UrlFetch {
            url,
            status,
            use_javascript,
            content_length,
        } => {
            assert_eq!(url, "https://example.com");
            assert_eq!(status, FetchPhase::Fetching);
            assert_eq!(use_javascript, Some(true));
            assert_eq!(content_length, None);
        }
        other => panic!("Unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_multiple_subscribers() {
    let bus = ScrapeEventBus::new(10);
    let mut receiver1 = bus.subscribe();
    let mut receiver2 = bus.subscribe();

    assert_eq!(bus.publish(progress(1)).await.ok(), Some(2));

    for receiver in [&mut receiver1, &mut receiver2] {
        match timeout(Duration::from_millis(100), receiver.recv()).await {
            Ok(Ok(ScrapeEvent::Progress { pages_scraped, .. })) => assert_eq!(pages_scraped, 1),
            other => panic!("Receiver did not get the progress event: {other:?}"),
        }
    }
}

#[test]
fn test_events_serialize_with_kebab_case_tags() {
    let json = serde_json::to_value(ScrapeEvent::fetch_completed("https://x.test/", 42)).unwrap();
    assert_eq!(json["type"], "url-fetch");
    assert_eq!(json["status"], "complete");
    assert_eq!(json["contentLength"], 42);
    assert!(json.get("useJavascript").is_none());

    let json = serde_json::to_value(ScrapeEvent::BatchComplete {
        processed_in_batch: 5,
        extracted_total: 10,
    })
    .unwrap();
    assert_eq!(json["type"], "batch-complete");
    assert_eq!(json["processedInBatch"], 5);
}

#[test]
fn test_event_kind_and_url() {
    let event = ScrapeEvent::UrlLinks {
        url: "https://x.test/a".into(),
        link_count: 3,
    };
    assert_eq!(event.kind(), "url-links");
    assert_eq!(event.url(), Some("https://x.test/a"));
    assert_eq!(progress(0).url(), None);
}

#[tokio::test]
async fn test_filtered_receiver() {
    let bus = ScrapeEventBus::new(10);
    let mut filtered = bus.subscribe_filtered(|event| matches!(event, ScrapeEvent::Error { .. }));

    let _ = bus.publish(progress(1)).await;
    let _ = bus.publish(ScrapeEvent::error("fetch failed")).await;

    match timeout(Duration::from_millis(100), filtered.recv()).await {
        Ok(Ok(ScrapeEvent::Error { error })) => assert_eq!(error, "fetch failed"),
        other => panic!("Expected the error event, got: {other:?}"),
    }
    assert!(matches!(filtered.try_recv(), Ok(None)));
    assert!(filtered.would_receive(&ScrapeEvent::error("x")));
    assert!(!filtered.would_receive(&progress(2)));
}

#[tokio::test]
async fn test_batch_publish() {
    let bus = ScrapeEventBus::new(50);
    let mut receiver = bus.subscribe();

    let result = bus
        .publish_batch(vec![progress(1), progress(2), progress(3)])
        .await;
    assert!(result.is_complete());
    assert_eq!(result.published, 3);
    assert_eq!(result.max_subscribers, 1);

    for i in 1..=3 {
        match timeout(Duration::from_millis(100), receiver.recv()).await {
            Ok(Ok(ScrapeEvent::Progress { pages_scraped, .. })) => assert_eq!(pages_scraped, i),
            other => panic!("Missing event {i}: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_error_backpressure_rejects_when_full() {
    let bus = ScrapeEventBus::with_config(EventBusConfig {
        capacity: 2,
        backpressure_mode: BackpressureMode::Error,
        ..Default::default()
    });
    let _receiver = bus.subscribe();

    assert!(bus.publish_with_backpressure(progress(1)).await.is_ok());
    assert!(bus.publish_with_backpressure(progress(2)).await.is_ok());
    assert!(matches!(
        bus.publish_with_backpressure(progress(3)).await,
        Err(EventBusError::ChannelFull)
    ));
}

#[tokio::test]
async fn test_drop_oldest_lags_slow_receivers() {
    let bus = ScrapeEventBus::new(2);
    let mut receiver = bus.subscribe();

    for n in 0..5 {
        assert!(bus.publish_with_backpressure(progress(n)).await.is_ok());
    }
    assert!(matches!(
        receiver.recv().await,
        Err(tokio::sync::broadcast::error::RecvError::Lagged(_))
    ));
}

#[test]
fn test_metrics_report() {
    let bus = ScrapeEventBus::new(10);
    let report = bus.get_metrics_report();
    assert!(report.contains("Event Bus Metrics:"));
    assert!(report.contains("Events Published: 0"));

    let bus = ScrapeEventBus::with_config(EventBusConfig {
        enable_metrics: false,
        ..Default::default()
    });
    assert_eq!(bus.get_metrics_report(), "Metrics disabled");
}

#[tokio::test]
async fn test_graceful_shutdown_announces_reason() {
    let bus = ScrapeEventBus::with_config(EventBusConfig {
        drain_timeout_ms: 10,
        ..Default::default()
    });
    let mut receiver = bus.subscribe();

    bus.shutdown_gracefully(ShutdownReason::Cancelled).await;
    assert!(bus.is_shutdown());

    match timeout(Duration::from_millis(100), receiver.recv()).await {
        Ok(Ok(ScrapeEvent::Shutdown { reason, .. })) => {
            assert_eq!(reason, ShutdownReason::Cancelled);
        }
        other => panic!("Expected shutdown event, got: {other:?}"),
    }

    // Second call is a no-op
    bus.shutdown_gracefully(ShutdownReason::ScrapeCompleted).await;
    assert!(receiver.try_recv().is_err());
}

//! Core ScrapeEventBus struct definition and constructors

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use tokio::sync::{Mutex, Notify, broadcast};

use crate::crawl_events::config::EventBusConfig;
use crate::crawl_events::metrics::EventBusMetrics;
use crate::crawl_events::types::ScrapeEvent;

/// Event bus for publishing and subscribing to scrape events
#[derive(Debug)]
pub struct ScrapeEventBus {
    pub(super) sender: broadcast::Sender<ScrapeEvent>,
    pub(super) config: Arc<EventBusConfig>,
    pub(super) metrics: EventBusMetrics,
    pub(super) shutdown: Arc<Notify>,
    pub(super) shutdown_flag: Arc<AtomicBool>,
    pub(super) send_lock: Arc<Mutex<()>>,
    /// Live handle count, so only the last dropped handle signals shutdown
    pub(super) num_instances: Arc<AtomicUsize>,
}

impl ScrapeEventBus {
    /// Create a new event bus with the specified capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let config = EventBusConfig {
            capacity,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create a new event bus with custom configuration
    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        // broadcast::channel panics on zero capacity
        let capacity = config.capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            config: Arc::new(EventBusConfig { capacity, ..config }),
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            send_lock: Arc::new(Mutex::new(())),
            num_instances: Arc::new(AtomicUsize::new(1)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Individual counter reads are atomic; use `metrics().snapshot()` for a
    /// consistent view across counters.
    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Ratio of buffered events to capacity (0.0 = empty, 1.0 = full)
    #[must_use]
    pub fn pressure(&self) -> f64 {
        self.sender.len() as f64 / self.config.capacity as f64
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.sender.len()
    }
}

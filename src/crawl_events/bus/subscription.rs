//! Subscription operations for the ScrapeEventBus

use tokio::sync::broadcast;

use crate::crawl_events::streaming::FilteredReceiver;
use crate::crawl_events::types::ScrapeEvent;

use super::core::ScrapeEventBus;

impl ScrapeEventBus {
    /// Subscribe to every event published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let count = self.sender.receiver_count();
        if self.config.enable_metrics {
            self.metrics.update_subscriber_count(count);
        }
        count
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Create a subscriber that only receives events passing `filter`
    ///
    /// ```rust,ignore
    /// let mut completions = bus.subscribe_filtered(|e| e.kind() == "url-complete");
    /// ```
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&ScrapeEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}

//! Publishing operations for the ScrapeEventBus

use crate::crawl_events::config::BackpressureMode;
use crate::crawl_events::errors::EventBusError;
use crate::crawl_events::types::{BatchPublishResult, ScrapeEvent};

use super::core::ScrapeEventBus;

impl ScrapeEventBus {
    /// Publish an event to all subscribers
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of active subscribers that received the event
    /// * `Err(EventBusError::NoSubscribers)` - Nobody is listening
    pub async fn publish(&self, event: ScrapeEvent) -> Result<usize, EventBusError> {
        self.send(event)
    }

    /// Publish an event respecting the configured backpressure mode
    ///
    /// - **`DropOldest`**: Same as `publish()`, never blocks
    /// - **Error**: Returns `ChannelFull` if the buffer is at capacity
    pub async fn publish_with_backpressure(
        &self,
        event: ScrapeEvent,
    ) -> Result<usize, EventBusError> {
        match self.config.backpressure_mode {
            BackpressureMode::DropOldest => self.publish(event).await,
            BackpressureMode::Error => {
                // Serialize check-and-send so two publishers can't both see free space
                let _guard = self.send_lock.lock().await;
                if self.sender.len() >= self.config.capacity {
                    return Err(EventBusError::ChannelFull);
                }
                self.send(event)
            }
        }
    }

    /// Publish multiple events with best-effort delivery
    ///
    /// Every event is attempted; failures don't stop the remaining events.
    pub async fn publish_batch(&self, events: Vec<ScrapeEvent>) -> BatchPublishResult {
        let total = events.len();
        let mut published = 0;
        let mut failed = 0;
        let mut max_subscribers = 0;

        for event in events {
            match self.send(event) {
                Ok(count) => {
                    published += 1;
                    max_subscribers = max_subscribers.max(count);
                }
                Err(_) => failed += 1,
            }
        }

        BatchPublishResult {
            total,
            published,
            failed,
            max_subscribers,
        }
    }

    fn send(&self, event: ScrapeEvent) -> Result<usize, EventBusError> {
        if let Ok(subscriber_count) = self.sender.send(event) {
            if self.config.enable_metrics {
                self.metrics.increment_published();
                self.metrics.update_subscriber_count(subscriber_count);
            }
            Ok(subscriber_count)
        } else {
            if self.config.enable_metrics {
                self.metrics.increment_failed();
                self.metrics.increment_dropped();
            }
            log::trace!("Dropped scrape event: no active subscribers");
            Err(EventBusError::NoSubscribers)
        }
    }
}

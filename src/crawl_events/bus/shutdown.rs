//! Shutdown operations for the ScrapeEventBus

use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::crawl_events::types::{ScrapeEvent, ShutdownReason};

use super::core::ScrapeEventBus;

impl ScrapeEventBus {
    /// Signal shutdown to all subscribers
    ///
    /// Idempotent. All clones of this bus share the same shutdown signal.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        log::debug!("Event bus shutdown signaled");
    }

    /// Wait for the shutdown signal
    ///
    /// ```rust,ignore
    /// tokio::select! {
    ///     Ok(event) = rx.recv() => { /* handle event */ }
    ///     _ = bus.wait_for_shutdown() => { break; }
    /// }
    /// ```
    pub async fn wait_for_shutdown(&self) {
        if self.is_shutdown() {
            return;
        }
        self.shutdown.notified().await;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Publish a `shutdown` event, give subscribers the configured drain
    /// window to catch up, then signal shutdown.
    pub async fn shutdown_gracefully(&self, reason: ShutdownReason) {
        if self.shutdown_flag.swap(true, Ordering::SeqCst) {
            log::debug!("Event bus already shut down, ignoring {reason:?}");
            return;
        }
        log::debug!("Beginning graceful shutdown of event bus: {reason:?}");

        let _ = self.publish(ScrapeEvent::shutdown(reason)).await;

        // Heuristic: there is no acknowledgement protocol, so wait a fixed window
        if self.has_subscribers() {
            tokio::time::sleep(Duration::from_millis(self.config.drain_timeout_ms)).await;
        }

        self.shutdown.notify_waiters();
        log::debug!("Event bus graceful shutdown complete");
    }
}

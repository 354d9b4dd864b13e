//! Metrics reporting for the ScrapeEventBus

use super::core::ScrapeEventBus;

impl ScrapeEventBus {
    /// Human-readable metrics summary built from one consistent snapshot
    #[must_use]
    pub fn get_metrics_report(&self) -> String {
        if !self.config.enable_metrics {
            return "Metrics disabled".to_string();
        }

        let snapshot = self.metrics.snapshot();

        format!(
            "Event Bus Metrics:\n\
             - Events Published: {}\n\
             - Events Dropped: {}\n\
             - Events Failed: {}\n\
             - Active Subscribers: {}\n\
             - Peak Subscribers: {}\n\
             - Success Rate: {:.2}%",
            snapshot.events_published,
            snapshot.events_dropped,
            snapshot.events_failed,
            snapshot.active_subscribers,
            snapshot.peak_subscribers,
            snapshot.success_rate() * 100.0
        )
    }
}

//! Standard trait implementations for ScrapeEventBus

use std::sync::atomic::Ordering;

use crate::crawl_events::config::EventBusConfig;

use super::core::ScrapeEventBus;

impl Default for ScrapeEventBus {
    fn default() -> Self {
        Self::with_config(EventBusConfig::default())
    }
}

impl Clone for ScrapeEventBus {
    fn clone(&self) -> Self {
        self.num_instances.fetch_add(1, Ordering::Relaxed);
        Self {
            sender: self.sender.clone(),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.clone(),
            shutdown_flag: self.shutdown_flag.clone(),
            send_lock: self.send_lock.clone(),
            num_instances: self.num_instances.clone(),
        }
    }
}

impl Drop for ScrapeEventBus {
    fn drop(&mut self) {
        // fetch_sub returns the value BEFORE decrementing
        if 1 == self.num_instances.fetch_sub(1, Ordering::AcqRel) {
            self.shutdown_flag.store(true, Ordering::SeqCst);
            self.shutdown.notify_waiters();
            log::trace!("Event bus dropped (last instance), shutdown signal sent");
        }
    }
}

//! Background timers racing the pipeline: wall-clock timeout and stagnation
//!
//! Watchdogs only read the shared progress counters and report through the
//! termination signal. They are aborted when the run ends.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::crawl_state::ProgressCounters;
use super::crawl_types::TerminationReason;
use super::termination::TerminationSignal;
use crate::config::ScrapeConfig;

/// Handles of the spawned watchdog tasks. Dropping aborts them.
#[derive(Debug)]
pub struct Watchdogs {
    handles: Vec<JoinHandle<()>>,
}

impl Watchdogs {
    /// Arm the timeout and, when enabled, the stagnation detector
    #[must_use]
    pub fn arm(
        signal: &TerminationSignal,
        counters: Arc<ProgressCounters>,
        config: &ScrapeConfig,
    ) -> Self {
        let mut handles = vec![spawn_timeout(signal.clone(), config.max_execution_time())];
        if let Some(window) = config.deadlock_detection() {
            handles.push(spawn_stagnation_detector(
                signal.clone(),
                counters,
                window,
                config.deadlock_check_interval(),
            ));
        }
        Self { handles }
    }
}

impl Drop for Watchdogs {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Trigger `Timeout` once `limit` has elapsed
pub fn spawn_timeout(signal: TerminationSignal, limit: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(limit).await;
        if signal.trigger(TerminationReason::Timeout) {
            warn!(
                target: "goalcrawl::guard",
                "Execution timeout after {}ms, finalizing with current results",
                limit.as_millis()
            );
        }
    })
}

/// Trigger `Deadlock` when neither counter moves for `window`
pub fn spawn_stagnation_detector(
    signal: TerminationSignal,
    counters: Arc<ProgressCounters>,
    window: Duration,
    check_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(check_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        let mut last_seen = counters.snapshot();
        let mut last_change = Instant::now();

        loop {
            ticker.tick().await;
            if signal.is_triggered() {
                return;
            }

            let current = counters.snapshot();
            if current != last_seen {
                last_seen = current;
                last_change = Instant::now();
                continue;
            }

            let idle = last_change.elapsed();
            debug!(
                target: "goalcrawl::guard",
                "No progress for {}ms (extracted={}, visited={})",
                idle.as_millis(),
                current.0,
                current.1
            );
            if idle >= window {
                if signal.trigger(TerminationReason::Deadlock) {
                    warn!(
                        target: "goalcrawl::guard",
                        "Stagnation detected: no new pages or visits in {}ms",
                        idle.as_millis()
                    );
                }
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_after_limit() {
        let signal = TerminationSignal::new();
        let started = Instant::now();
        let _handle = spawn_timeout(signal.clone(), Duration::from_millis(500));
        let reason = tokio::time::timeout(Duration::from_secs(5), signal.wait()).await;
        assert_eq!(reason.ok(), Some(TerminationReason::Timeout));
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn stagnation_detector_reports_deadlock() {
        let signal = TerminationSignal::new();
        let counters = Arc::new(ProgressCounters::default());
        let _handle = spawn_stagnation_detector(
            signal.clone(),
            counters,
            Duration::from_millis(300),
            Duration::from_millis(100),
        );
        let reason = tokio::time::timeout(Duration::from_secs(5), signal.wait()).await;
        assert_eq!(reason.ok(), Some(TerminationReason::Deadlock));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_check_interval_still_samples() {
        let signal = TerminationSignal::new();
        let counters = Arc::new(ProgressCounters::default());
        let handle = spawn_stagnation_detector(
            signal.clone(),
            counters,
            Duration::from_millis(50),
            Duration::ZERO,
        );
        let reason = tokio::time::timeout(Duration::from_secs(1), signal.wait()).await;
        assert_eq!(reason.ok(), Some(TerminationReason::Deadlock));
        assert!(handle.await.is_ok());
    }
}

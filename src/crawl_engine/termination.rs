//! Set-once termination signal shared by every participant in the run race
//!
//! Normal completion, the iteration cap, the wall-clock timeout, the
//! stagnation detector, cycle detection and caller cancellation all report
//! here. Only the first trigger is kept.

use std::sync::Arc;

use tokio::sync::watch;

use super::crawl_types::TerminationReason;

#[derive(Debug, Clone)]
pub struct TerminationSignal {
    tx: Arc<watch::Sender<Option<TerminationReason>>>,
}

impl Default for TerminationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminationSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Record `reason` if nothing has triggered yet.
    ///
    /// Returns `true` only for the trigger that won.
    pub fn trigger(&self, reason: TerminationReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    #[must_use]
    pub fn reason(&self) -> Option<TerminationReason> {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolve once any participant has triggered
    pub async fn wait(&self) -> TerminationReason {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(reason) = *rx.borrow_and_update() {
                return reason;
            }
            if rx.changed().await.is_err() {
                // Sender lives as long as self, so this cannot resolve
                return std::future::pending().await;
            }
        }
    }
}

/// Caller-side handle that cancels a running crawl
#[derive(Debug, Clone)]
pub struct CancelHandle {
    signal: TerminationSignal,
}

impl CancelHandle {
    pub(crate) fn new(signal: TerminationSignal) -> Self {
        Self { signal }
    }

    /// Request cancellation. Returns `false` if the run had already ended.
    pub fn cancel(&self) -> bool {
        self.signal.trigger(TerminationReason::Cancelled)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.signal.reason() == Some(TerminationReason::Cancelled)
    }
}

//! Configuration types for the event bus

/// Strategy for handling channel saturation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressureMode {
    /// Drop oldest events when channel is full
    /// Publishers never block, receivers may see `RecvError::Lagged`
    #[default]
    DropOldest,

    /// Return error when channel is full
    Error,
}

/// Configuration for the event bus
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Maximum number of events that can be buffered
    pub capacity: usize,

    /// Backpressure strategy when channel reaches capacity
    pub backpressure_mode: BackpressureMode,

    /// How long `shutdown_gracefully` waits for subscribers to drain, in milliseconds
    pub drain_timeout_ms: u64,

    /// Whether to enable event metrics collection
    pub enable_metrics: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            backpressure_mode: BackpressureMode::default(),
            drain_timeout_ms: 100,
            enable_metrics: true,
        }
    }
}

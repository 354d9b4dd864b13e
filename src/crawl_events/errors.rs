/// Why a scrape event could not be delivered or received
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// Nobody is subscribed to the crawl feed
    #[error("no subscribers on the scrape event feed")]
    NoSubscribers,

    /// A subscriber fell behind and the oldest events were overwritten
    #[error("subscriber lagged and skipped {0} scrape events")]
    ReceiverLagged(u64),

    /// The feed was closed after the crawl finished
    #[error("scrape event feed closed")]
    Shutdown,

    /// The buffer is full and the feed runs with `BackpressureMode::Error`
    #[error("scrape event buffer full")]
    ChannelFull,
}

//! The `DataHandler` trait every event consumer implements: the archival
//! coordinator, the messaging sinks, and the schedule engine's
//! handler-fanout redelivery strategy all implement it.

use feed_model::Event;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[async_trait::async_trait]
pub trait DataHandler: Send + Sync {
    /// Handlers are fire-and-forget: they log their own failures and never
    /// propagate an error back to the caller, matching the ingress
    /// contract (the HTTP response has already been sent by the time
    /// handlers run).
    async fn handle(&self, cancel: CancellationToken, event: Arc<Event>);
}

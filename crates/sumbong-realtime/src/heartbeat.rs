//! Heartbeat frames interleaved with a connection's events.

use std::time::Duration;

use chrono::Utc;
use sumbong_core::events::RealtimeEvent;
use tokio::time::{Instant, interval_at};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};

use crate::registry::EventStream;

/// Merge a `ping` every `every` into `events`. The combined stream ends
/// when `events` ends, e.g. after a reconnect replaced this connection.
pub fn with_heartbeat(
    events: EventStream,
    every: Duration,
) -> impl Stream<Item = RealtimeEvent> + Send + 'static {
    let events = events.map(Some).chain(tokio_stream::once(None));
    let pings = IntervalStream::new(interval_at(Instant::now() + every, every))
        .map(|_| Some(RealtimeEvent::Ping { at: Utc::now() }));

    events
        .merge(pings)
        .take_while(Option::is_some)
        .filter_map(|event| event)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::registry::ConnectionRegistry;

    #[tokio::test(start_paused = true)]
    async fn pings_are_interleaved() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let user = Uuid::new_v4();
        let stream = with_heartbeat(registry.connect(user), Duration::from_secs(25));
        tokio::pin!(stream);

        assert!(matches!(
            stream.next().await,
            Some(RealtimeEvent::Connected { .. })
        ));
        // Time is paused; the runtime auto-advances to the next tick.
        assert!(matches!(stream.next().await, Some(RealtimeEvent::Ping { .. })));
        assert!(matches!(stream.next().await, Some(RealtimeEvent::Ping { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn ends_when_replaced() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let user = Uuid::new_v4();
        let stream = with_heartbeat(registry.connect(user), Duration::from_secs(25));
        tokio::pin!(stream);

        assert!(matches!(
            stream.next().await,
            Some(RealtimeEvent::Connected { .. })
        ));

        let _newer = registry.connect(user);
        assert_eq!(stream.next().await, None);
    }
}

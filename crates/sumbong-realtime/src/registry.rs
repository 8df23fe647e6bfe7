//! Connection registry: at most one live stream per user.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use sumbong_core::events::RealtimeEvent;
use sumbong_core::notifier::EventPublisher;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::Stream;
use tracing::{debug, trace};
use uuid::Uuid;

/// Outcome of a single push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the user's open stream.
    Sent,
    /// No stream is open for the user; nothing happened.
    Offline,
    /// The stream's buffer is full; the event was discarded.
    Dropped,
    /// The stream had already closed; its entry was removed.
    Evicted,
}

struct Connection {
    id: u64,
    tx: mpsc::Sender<RealtimeEvent>,
}

/// Shared, injected map of open realtime streams keyed by user id.
///
/// A reconnect replaces the previous handle, which ends the older
/// stream. Sends are synchronous and never block the caller.
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, Connection>,
    next_id: AtomicU64,
    buffer_size: usize,
}

impl ConnectionRegistry {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Open a stream for `user_id`. The first item is always
    /// [`RealtimeEvent::Connected`].
    pub fn connect(self: &Arc<Self>, user_id: Uuid) -> EventStream {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Capacity is at least one, so this cannot fail.
        let _ = tx.try_send(RealtimeEvent::Connected { user_id });

        if self
            .connections
            .insert(user_id, Connection { id, tx })
            .is_some()
        {
            debug!(user_id = %user_id, "realtime connection replaced");
        } else {
            debug!(user_id = %user_id, "realtime connection opened");
        }

        EventStream {
            rx,
            _guard: ConnectionGuard {
                registry: Arc::clone(self),
                user_id,
                id,
            },
        }
    }

    /// Push `event` to `user_id` without waiting.
    pub fn send(&self, user_id: Uuid, event: RealtimeEvent) -> Delivery {
        let Some(conn) = self.connections.get(&user_id) else {
            trace!(user_id = %user_id, kind = event.kind(), "user offline, event skipped");
            return Delivery::Offline;
        };

        match conn.tx.try_send(event) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(event)) => {
                debug!(user_id = %user_id, kind = event.kind(), "event dropped: buffer full");
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                let id = conn.id;
                // Release the shard read lock before removing.
                drop(conn);
                self.remove(user_id, id);
                debug!(user_id = %user_id, "closed connection evicted");
                Delivery::Evicted
            }
        }
    }

    pub fn is_connected(&self, user_id: Uuid) -> bool {
        self.connections.contains_key(&user_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Remove the entry only while it still belongs to connection `id`.
    fn remove(&self, user_id: Uuid, id: u64) {
        self.connections.remove_if(&user_id, |_, conn| conn.id == id);
    }
}

impl EventPublisher for ConnectionRegistry {
    fn publish(&self, user_id: Uuid, event: RealtimeEvent) {
        self.send(user_id, event);
    }
}

struct ConnectionGuard {
    registry: Arc<ConnectionRegistry>,
    user_id: Uuid,
    id: u64,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.remove(self.user_id, self.id);
        trace!(user_id = %self.user_id, connection = self.id, "realtime stream dropped");
    }
}

/// Events for one connection. Dropping it unregisters the connection
/// unless a newer one has replaced it.
pub struct EventStream {
    rx: mpsc::Receiver<RealtimeEvent>,
    _guard: ConnectionGuard,
}

impl Stream for EventStream {
    type Item = RealtimeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumbong_core::models::complaint::ComplaintStatus;
    use tokio_stream::StreamExt;

    fn status(complaint_id: Uuid) -> RealtimeEvent {
        RealtimeEvent::StatusUpdate {
            complaint_id,
            status: ComplaintStatus::InProgress,
        }
    }

    #[tokio::test]
    async fn offline_user_is_a_noop() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        assert_eq!(
            registry.send(Uuid::new_v4(), status(Uuid::new_v4())),
            Delivery::Offline
        );
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn connected_user_receives_events_in_order() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let user = Uuid::new_v4();
        let complaint = Uuid::new_v4();

        let mut stream = registry.connect(user);
        assert_eq!(registry.send(user, status(complaint)), Delivery::Sent);

        assert_eq!(
            stream.next().await,
            Some(RealtimeEvent::Connected { user_id: user })
        );
        assert_eq!(stream.next().await, Some(status(complaint)));
    }

    #[tokio::test]
    async fn reconnect_replaces_previous_stream() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let user = Uuid::new_v4();
        let complaint = Uuid::new_v4();

        let mut first = registry.connect(user);
        let mut second = registry.connect(user);
        assert_eq!(registry.connection_count(), 1);

        registry.send(user, status(complaint));

        // The old stream ends after its greeting.
        assert!(matches!(first.next().await, Some(RealtimeEvent::Connected { .. })));
        assert_eq!(first.next().await, None);

        assert!(matches!(second.next().await, Some(RealtimeEvent::Connected { .. })));
        assert_eq!(second.next().await, Some(status(complaint)));
    }

    #[tokio::test]
    async fn dropping_old_stream_keeps_newer_registration() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let user = Uuid::new_v4();

        let first = registry.connect(user);
        let _second = registry.connect(user);
        drop(first);

        assert!(registry.is_connected(user));
        assert_eq!(registry.send(user, status(Uuid::new_v4())), Delivery::Sent);
    }

    #[tokio::test]
    async fn dropping_stream_unregisters() {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let user = Uuid::new_v4();

        let stream = registry.connect(user);
        assert!(registry.is_connected(user));
        drop(stream);

        assert!(!registry.is_connected(user));
        assert_eq!(registry.send(user, status(Uuid::new_v4())), Delivery::Offline);
    }

    #[tokio::test]
    async fn full_buffer_drops_without_blocking() {
        let registry = Arc::new(ConnectionRegistry::new(2));
        let user = Uuid::new_v4();
        let _stream = registry.connect(user);

        // One slot is taken by the greeting.
        assert_eq!(registry.send(user, status(Uuid::new_v4())), Delivery::Sent);
        assert_eq!(registry.send(user, status(Uuid::new_v4())), Delivery::Dropped);
        assert!(registry.is_connected(user));
    }

    #[tokio::test]
    async fn closed_receiver_is_evicted() {
        let registry = ConnectionRegistry::new(8);
        let user = Uuid::new_v4();

        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        registry.connections.insert(user, Connection { id: 7, tx });

        assert_eq!(registry.send(user, status(Uuid::new_v4())), Delivery::Evicted);
        assert!(!registry.is_connected(user));
    }

    #[tokio::test]
    async fn concurrent_publishers_and_connections() {
        let registry = Arc::new(ConnectionRegistry::new(256));
        let users: Vec<Uuid> = (0..16).map(|_| Uuid::new_v4()).collect();
        let streams: Vec<EventStream> = users.iter().map(|u| registry.connect(*u)).collect();

        let mut tasks = Vec::new();
        for user in users.clone() {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                for _ in 0..10 {
                    registry.publish(user, status(Uuid::new_v4()));
                    registry.publish(Uuid::new_v4(), status(Uuid::new_v4()));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.connection_count(), users.len());
        drop(streams);
        assert_eq!(registry.connection_count(), 0);
    }
}

//! Outbound side-effect ports: realtime push and transactional email.
//!
//! Both are best-effort from the caller's point of view. Failures are
//! logged by the caller and never fail the primary action.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::SumbongResult;
use crate::events::RealtimeEvent;

/// Fire-and-forget delivery of an event to one user's open channel.
///
/// Implementations must not block and must treat an offline user as a
/// silent no-op.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, user_id: Uuid, event: RealtimeEvent);
}

impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    fn publish(&self, user_id: Uuid, event: RealtimeEvent) {
        (**self).publish(user_id, event)
    }
}

/// A rendered transactional email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, email: OutgoingEmail) -> impl Future<Output = SumbongResult<()>> + Send;
}

impl<T: Mailer> Mailer for Arc<T> {
    fn send(&self, email: OutgoingEmail) -> impl Future<Output = SumbongResult<()>> + Send {
        (**self).send(email)
    }
}

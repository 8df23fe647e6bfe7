//! SurrealDB repository implementations.

mod complaint;
mod notification;
mod user;

pub use complaint::SurrealComplaintRepository;
pub use notification::SurrealNotificationRepository;
pub use user::SurrealUserRepository;

//! Sumbong Core: domain models, repository traits, notifier ports and
//! the shared error taxonomy.
//!
//! Every other crate in the workspace depends on this one. It has no
//! knowledge of the database, the HTTP layer, or any third-party
//! service.

pub mod error;
pub mod events;
pub mod models;
pub mod notifier;
pub mod repository;
pub mod validation;

pub use error::{SumbongError, SumbongResult};
pub use events::RealtimeEvent;

//! Sumbong Realtime: best-effort per-user event push.
//!
//! The registry is an in-process map from user id to a bounded channel.
//! Producers never await and never fail; a client that misses an event
//! re-fetches over REST.

pub mod config;
pub mod heartbeat;
pub mod registry;

pub use config::RealtimeConfig;
pub use heartbeat::with_heartbeat;
pub use registry::{ConnectionRegistry, Delivery, EventStream};

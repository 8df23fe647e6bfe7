//! Sumbong Database: SurrealDB connection management, schema
//! migrations, and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Error types ([`DbError`])
//! - Implementations of the `sumbong-core` repository traits
//!   ([`repository`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};

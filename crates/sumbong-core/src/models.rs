//! Domain models for Sumbong.
//!
//! These are the core types shared across all crates.

pub mod complaint;
pub mod notification;
pub mod user;

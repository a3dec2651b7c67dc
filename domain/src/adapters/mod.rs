//! Test-only adapters that live inside the domain crate for convenience.
//!
//! These are intended for unit testing and local demos. Durable adapters
//! (SQLite, DynamoDB) live in separate crates.

pub mod memory_repo;

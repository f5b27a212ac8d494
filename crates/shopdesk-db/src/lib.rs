//! Shopdesk Database — SurrealDB connection management, schema
//! migrations, repository implementations and catalog seeding.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `shopdesk-core` traits
//! - Idempotent bootstrap of the permission catalog ([`seed`])
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;
pub mod seed;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};

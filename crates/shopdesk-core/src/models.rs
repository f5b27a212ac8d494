//! Domain models for Shopdesk.
//!
//! These are the core types shared across all crates.

pub mod action;
pub mod audit;
pub mod menu;
pub mod permission;
pub mod resource;
pub mod role;
pub mod user;

//! Shopdesk Core — domain models, error taxonomy, repository traits and
//! the pure authorization logic shared by every other crate.

pub mod error;
pub mod menu_tree;
pub mod models;
pub mod principal;
pub mod repository;

pub use error::{ShopdeskError, ShopdeskResult};
pub use principal::{Principal, PrincipalRole, Session};

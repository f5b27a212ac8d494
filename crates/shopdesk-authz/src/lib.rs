//! Shopdesk Authz — the authorization gate, role and menu
//! administration, menu resolution with caching, and audit recording.

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod menu;
pub mod result;
pub mod roles;

pub use audit::{AuditLogService, AuditRecorder};
pub use cache::{CacheInvalidator, Invalidation, MenuCache};
pub use config::AuthzConfig;
pub use error::AuthzError;
pub use gate::AuthorizationGate;
pub use menu::MenuService;
pub use result::ActionResult;
pub use roles::RoleService;

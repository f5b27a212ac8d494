//! SurrealDB repository implementations.

mod action;
mod audit;
mod menu;
mod permission;
mod resource;
mod role;
mod user;

pub use action::SurrealActionRepository;
pub use audit::SurrealAuditLogRepository;
pub use menu::SurrealMenuRepository;
pub use permission::SurrealPermissionRepository;
pub use resource::SurrealResourceRepository;
pub use role::SurrealRoleRepository;
pub use user::{SurrealUserRepository, verify_password};

use uuid::Uuid;

use crate::error::DbError;

/// Parse a UUID stored as a string column.
pub(crate) fn parse_uuid(value: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {what} UUID: {e}")))
}

/// Parse an optional UUID column.
pub(crate) fn parse_opt_uuid(value: Option<&str>, what: &str) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, what)).transpose()
}

/// Render record ids for inline use, e.g. `[permission:`a`, permission:`b`]`.
///
/// Only ever called with `Uuid` values, whose textual form is safe to
/// embed in a query.
pub(crate) fn record_list(table: &str, ids: &[Uuid]) -> String {
    let items: Vec<String> = ids.iter().map(|id| format!("{table}:`{id}`")).collect();
    format!("[{}]", items.join(", "))
}

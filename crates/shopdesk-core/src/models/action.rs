//! Action domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verb applied to a resource (`view`, `create`, `update`, `delete`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAction {
    pub name: String,
    pub description: String,
}

//! Resource domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A protectable noun such as `Product` or `User`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResource {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
}

//! Error types for the Shopdesk authorization core.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ShopdeskError {
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    #[error("Principal not found: user {user_id}")]
    PrincipalNotFound { user_id: Uuid, message: String },

    #[error("Forbidden: missing permission {permission}")]
    Forbidden { permission: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { entity: String, message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopdeskError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True for the three failures produced by the authorization gate.
    pub fn is_auth_denial(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. } | Self::PrincipalNotFound { .. } | Self::Forbidden { .. }
        )
    }
}

pub type ShopdeskResult<T> = Result<T, ShopdeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_denials_are_classified() {
        assert!(
            ShopdeskError::Unauthenticated {
                message: "no".into()
            }
            .is_auth_denial()
        );
        assert!(
            ShopdeskError::Forbidden {
                permission: "roles.update".into(),
                message: "no".into()
            }
            .is_auth_denial()
        );
        assert!(!ShopdeskError::validation("too short").is_auth_denial());
        assert!(!ShopdeskError::not_found("role", Uuid::nil()).is_auth_denial());
    }
}

//! Authorization error types.

use shopdesk_core::error::ShopdeskError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("no active session")]
    Unauthenticated { message: String },

    #[error("session user {user_id} does not exist")]
    PrincipalNotFound { user_id: Uuid, message: String },

    #[error("missing permission {permission}")]
    Forbidden { permission: String, message: String },

    /// The principal could not be loaded for a reason other than absence.
    #[error(transparent)]
    Lookup(ShopdeskError),
}

impl AuthzError {
    /// The message to surface to the caller.
    pub fn message(&self) -> Option<&str> {
        match self {
            AuthzError::Unauthenticated { message }
            | AuthzError::PrincipalNotFound { message, .. }
            | AuthzError::Forbidden { message, .. } => Some(message),
            AuthzError::Lookup(_) => None,
        }
    }
}

impl From<AuthzError> for ShopdeskError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated { message } => ShopdeskError::Unauthenticated { message },
            AuthzError::PrincipalNotFound { user_id, message } => {
                ShopdeskError::PrincipalNotFound { user_id, message }
            }
            AuthzError::Forbidden {
                permission,
                message,
            } => ShopdeskError::Forbidden {
                permission,
                message,
            },
            AuthzError::Lookup(inner) => inner,
        }
    }
}

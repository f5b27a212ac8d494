//! The authorization gate every guarded operation passes first.

use shopdesk_core::error::ShopdeskError;
use shopdesk_core::principal::{Principal, Session};
use shopdesk_core::repository::UserRepository;
use tracing::warn;

use crate::error::AuthzError;

/// Resolves a session to a principal and checks one permission.
///
/// Generic over the user repository so the gate has no dependency on
/// the database crate.
#[derive(Clone)]
pub struct AuthorizationGate<U: UserRepository> {
    users: U,
    denial_message: String,
}

impl<U: UserRepository> AuthorizationGate<U> {
    pub fn new(users: U, denial_message: impl Into<String>) -> Self {
        Self {
            users,
            denial_message: denial_message.into(),
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    /// Load the principal behind a session, roles and permission names
    /// included.
    pub async fn principal(&self, session: Option<&Session>) -> Result<Principal, AuthzError> {
        let Some(session) = session else {
            return Err(AuthzError::Unauthenticated {
                message: self.denial_message.clone(),
            });
        };

        match self.users.get_with_roles(session.user_id).await {
            Ok(user) => Ok(Principal::from(user)),
            Err(ShopdeskError::NotFound { .. }) => Err(AuthzError::PrincipalNotFound {
                user_id: session.user_id,
                message: self.denial_message.clone(),
            }),
            Err(e) => Err(AuthzError::Lookup(e)),
        }
    }

    /// Return the principal if it holds `permission`.
    ///
    /// `message` replaces the default denial text on `Forbidden`.
    pub async fn require_permission(
        &self,
        session: Option<&Session>,
        permission: &str,
        message: Option<&str>,
    ) -> Result<Principal, AuthzError> {
        let principal = match self.principal(session).await {
            Ok(principal) => principal,
            Err(e) => {
                warn!(permission, error = %e, "Authorization denied");
                return Err(e);
            }
        };

        if principal.has_permission(permission) {
            return Ok(principal);
        }

        warn!(
            user_id = %principal.id,
            permission,
            "Authorization denied: missing permission"
        );
        Err(AuthzError::Forbidden {
            permission: permission.to_string(),
            message: message.unwrap_or(self.denial_message.as_str()).to_string(),
        })
    }
}

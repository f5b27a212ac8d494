//! The result shape every guarded mutation returns to the UI.

use serde::{Deserialize, Serialize};
use shopdesk_core::error::{ShopdeskError, ShopdeskResult};
use tracing::error;

use crate::config::DEFAULT_DENIAL_MESSAGE;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Collapse an operation outcome. Infrastructure errors are logged
    /// here and reach the caller only as a generic message.
    pub fn from_outcome(operation: &str, outcome: ShopdeskResult<String>) -> Self {
        match outcome {
            Ok(message) => Self::ok(message),
            Err(err) => {
                if matches!(err, ShopdeskError::Database(_) | ShopdeskError::Internal(_)) {
                    error!(operation, error = %err, "Operation failed");
                }
                Self::from(err)
            }
        }
    }
}

impl From<ShopdeskError> for ActionResult {
    fn from(err: ShopdeskError) -> Self {
        match err {
            // The three denials carry the same opaque text unless the
            // operation supplied its own.
            ShopdeskError::Unauthenticated { message }
            | ShopdeskError::PrincipalNotFound { message, .. }
            | ShopdeskError::Forbidden { message, .. } => {
                if message.is_empty() {
                    Self::failed(DEFAULT_DENIAL_MESSAGE)
                } else {
                    Self::failed(message)
                }
            }
            ShopdeskError::Validation { message } | ShopdeskError::Conflict { message, .. } => {
                Self::failed(message)
            }
            ShopdeskError::NotFound { entity, .. } => Self::failed(format!("{entity} not found")),
            ShopdeskError::Database(_) | ShopdeskError::Internal(_) => {
                Self::failed(GENERIC_FAILURE_MESSAGE)
            }
        }
    }
}

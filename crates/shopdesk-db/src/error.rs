//! Database-specific error types and conversions.

use shopdesk_core::error::ShopdeskError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// True when the failure is a unique index rejecting a duplicate.
    pub fn is_unique_violation(&self) -> bool {
        let message = match self {
            DbError::Surreal(e) => e.to_string(),
            DbError::Query(msg) => msg.clone(),
            _ => return false,
        };
        message.contains("already contains")
    }
}

impl From<DbError> for ShopdeskError {
    fn from(err: DbError) -> Self {
        if err.is_unique_violation() {
            return ShopdeskError::Conflict {
                entity: "record".into(),
                message: "A record with the same unique value already exists".into(),
            };
        }
        match err {
            DbError::NotFound { entity, id } => ShopdeskError::NotFound { entity, id },
            other => ShopdeskError::Database(other.to_string()),
        }
    }
}
